pub mod connection;
pub mod post;
pub mod profile;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Text fields in stored documents may be absent or `null`; both read as "".
pub(crate) fn null_as_empty<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
