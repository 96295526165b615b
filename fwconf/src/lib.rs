//! Firewall XML configuration exports: entity extraction, snapshot diffing
//! and reverse cross-reference indexing.
//!
//! Exports are schema-less as far as this crate is concerned. Any element
//! with a `Name` child or a `transactionid` attribute is an entity, and its
//! children are classified into scalars, arrays and objects from instance
//! data by [`xml_value_core`].
//!
//! # Architecture
//!
//! - [`policy`]: Entity boundaries and reference-bearing tags, as data
//! - [`entity`]: The entity record and the shared "is this an entity" test
//! - [`extract`]: Known-tag and dynamic-tag extraction into a [`extract::ConfigurationModel`]
//! - [`firewall_rule`]: Flattened firewall rule view
//! - [`topology`]: VLAN, alias and LAG groupings by interface
//! - [`diff`]: Entity-level diff between two snapshots
//! - [`references`]: Chunked, cancelable reverse reference index
//! - [`report`]: Terminal rendering
//! - [`tag_format`]: Display labels for tag names
//!
//! # Example
//!
//! ```
//! use fwconf::diff::diff_configurations;
//! use fwconf::extract::parse_configuration;
//!
//! let old = parse_configuration(
//!     "<Configuration><IPHost><Name>Srv1</Name><IPAddress>10.0.0.1</IPAddress></IPHost></Configuration>",
//! )?;
//! let new = parse_configuration(
//!     "<Configuration><IPHost><Name>Srv1</Name><IPAddress>10.0.0.2</IPAddress></IPHost></Configuration>",
//! )?;
//! let result = diff_configurations(&old, &new);
//! assert_eq!(result.modified[0].key, "IPHost:Srv1");
//! # Ok::<(), fwconf::extract::ConfigError>(())
//! ```

pub mod diff;
pub mod entity;
pub mod extract;
pub mod firewall_rule;
pub mod policy;
pub mod references;
pub mod report;
pub mod tag_format;
pub mod topology;
