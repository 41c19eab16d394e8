//! Upstream catalog clients. Each owns its pagination protocol and query
//! translation; both normalize into [`crate::models::CatalogPage`].

pub mod anilist;
pub mod mal;
