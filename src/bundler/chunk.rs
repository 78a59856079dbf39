//! Chunk naming for code splitting

/// Vendor modules shared by every entry
pub const COMMON_CHUNK: &str = "common";

/// Bundler runtime and module manifest, split out of `common` so vendor
/// hashes stay stable when application code changes
pub const RUNTIME_CHUNK: &str = "manifest";

/// Chunks injected into the page named `page`.
///
/// Every page loads the runtime and vendor chunks; a page also loads the
/// entry bundle of the same name when one exists.
pub fn page_chunks(page: &str, has_entry: bool) -> Vec<String> {
    let mut chunks = vec![RUNTIME_CHUNK.to_string(), COMMON_CHUNK.to_string()];
    if has_entry {
        chunks.push(page.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_chunks() {
        assert_eq!(page_chunks("about", true), vec!["manifest", "common", "about"]);
        assert_eq!(page_chunks("404", false), vec!["manifest", "common"]);
    }
}
