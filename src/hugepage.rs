//! Host huge-page introspection.
//!
//! Huge pages must be pre-reserved and the caller's gid authorized through
//! the `vm.nr_hugepages` and `vm.hugetlb_shm_group` kernel parameters; see
//! <https://www.kernel.org/doc/Documentation/vm/hugetlbpage.txt>.
//!
//! The output of `cat /proc/meminfo` includes lines like:
//!
//! ```text
//! HugePages_Total: uuu
//! HugePages_Free:  vvv
//! Hugepagesize:    yyy kB
//! ```
//!
//! This module only reports what the host advertises there; it does not
//! enforce the precondition.

use lazy_static::lazy_static;
use std::fs;

const MEMINFO_PATH: &str = "/proc/meminfo";
const TOKEN: &str = "Hugepagesize:";

lazy_static! {
    static ref HUGEPAGE_SIZE: Option<usize> = {
        let meminfo = fs::read_to_string(MEMINFO_PATH).unwrap_or_default();
        parse_hugepage_size(&meminfo)
    };
}

/// Returns the host's default huge-page size in bytes, if advertised in
/// `/proc/meminfo`. Parsed once, on first call.
pub fn hugepage_size() -> Option<usize> {
    *HUGEPAGE_SIZE
}

fn parse_hugepage_size(meminfo: &str) -> Option<usize> {
    let line = meminfo.lines().find(|line| line.starts_with(TOKEN))?;
    let mut parts = line[TOKEN.len()..].split_whitespace();
    let size = parts.next()?.parse::<usize>().ok()?;
    match parts.next() {
        Some("kB") => Some(size * 1024),
        Some(_) => None,
        None => Some(size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_meminfo_lines() {
        assert_eq!(parse_hugepage_size("Hugepagesize:1024"), Some(1024));
        assert_eq!(
            parse_hugepage_size("Hugepagesize:    2048 kB"),
            Some(2 * 1024 * 1024)
        );
        assert_eq!(
            parse_hugepage_size("MemTotal: 16 kB\nHugepagesize: 2 kB\n"),
            Some(2048)
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_hugepage_size(""), None);
        assert_eq!(parse_hugepage_size("Hugepagesize:2kB"), None);
        assert_eq!(parse_hugepage_size("Hugepagesize: two kB"), None);
        assert_eq!(parse_hugepage_size("MemTotal: 16 kB"), None);
    }
}
