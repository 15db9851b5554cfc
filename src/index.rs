// Per-request holding index between requested ISBNs and directory libraries

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::directory::{Library, LibraryCode};
use crate::holdings::HoldingLibrary;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoldingIndex {
    by_isbn: HashMap<String, BTreeSet<LibraryCode>>,
    // ISBNs kept in request order
    by_library: HashMap<LibraryCode, Vec<String>>,
}

impl HoldingIndex {
    /// Builds the index from per-ISBN holdings, in request order. Codes that
    /// are not numeric or not present in `directory` are dropped.
    pub fn build<'a, I>(directory: &[Library], holdings: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [HoldingLibrary])>,
    {
        let known: HashSet<LibraryCode> = directory.iter().map(|l| l.lib_code).collect();
        let mut index = HoldingIndex::default();
        let mut dropped = 0usize;

        for (isbn, libraries) in holdings {
            for holding in libraries {
                match holding.lib_code.normalize() {
                    Some(code) if known.contains(&code) => index.insert(isbn, code),
                    _ => dropped += 1,
                }
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "ignored holdings outside the directory");
        }

        index
    }

    pub fn insert(&mut self, isbn: &str, code: LibraryCode) {
        self.by_isbn.entry(isbn.to_string()).or_default().insert(code);

        let isbns = self.by_library.entry(code).or_default();
        if !isbns.iter().any(|held| held == isbn) {
            isbns.push(isbn.to_string());
        }
    }

    pub fn books_held_by(&self, code: LibraryCode) -> &[String] {
        self.by_library.get(&code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn holds(&self, code: LibraryCode, isbn: &str) -> bool {
        self.by_isbn
            .get(isbn)
            .is_some_and(|codes| codes.contains(&code))
    }

    pub fn has_library(&self, code: LibraryCode) -> bool {
        self.by_library.contains_key(&code)
    }

    pub fn library_count(&self) -> usize {
        self.by_library.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_library.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> Vec<Library> {
        vec![Library::new(111001, "A"), Library::new(111002, "B")]
    }

    #[test]
    fn test_unknown_codes_are_dropped() {
        let first = vec![
            HoldingLibrary::new("111001", "A"),
            HoldingLibrary::new("999999", "Unknown"),
            HoldingLibrary::new("LIB001", "Not numeric"),
        ];
        let index = HoldingIndex::build(&directory(), [("isbn-1", first.as_slice())]);

        assert_eq!(index.library_count(), 1);
        assert!(index.has_library(111001));
        assert!(!index.has_library(999999));
        assert!(index.holds(111001, "isbn-1"));
        assert!(!index.holds(999999, "isbn-1"));
    }

    #[test]
    fn test_inverse_index_keeps_request_order() {
        let a = vec![HoldingLibrary::new("111002", "B")];
        let b = vec![
            HoldingLibrary::new("111001", "A"),
            HoldingLibrary::new("111002", "B"),
        ];
        let index = HoldingIndex::build(
            &directory(),
            [("isbn-1", a.as_slice()), ("isbn-2", b.as_slice())],
        );

        assert_eq!(index.books_held_by(111002), ["isbn-1", "isbn-2"]);
        assert_eq!(index.books_held_by(111001), ["isbn-2"]);
        assert!(index.holds(111001, "isbn-2"));
        assert!(!index.holds(111001, "isbn-1"));
        assert!(index.books_held_by(123).is_empty());
    }

    #[test]
    fn test_repeated_holding_is_counted_once() {
        let repeated = vec![
            HoldingLibrary::new("111001", "A"),
            HoldingLibrary::new("111001", "A"),
        ];
        let index = HoldingIndex::build(&directory(), [("isbn-1", repeated.as_slice())]);

        assert_eq!(index.books_held_by(111001), ["isbn-1"]);
    }
}
