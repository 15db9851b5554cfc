// Combination search: exhaustive enumeration of library sets up to
// MAX_COMBINATION_SIZE, ranked by coverage then by number of libraries used.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::catalog::BookMetadata;
use crate::directory::{Library, LibraryCode};
use crate::index::HoldingIndex;

pub const MAX_COMBINATION_SIZE: usize = 5;
pub const MAX_OPTIMAL_SETS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySummary {
    pub lib_code: LibraryCode,
    pub lib_name: String,
    pub address: Option<String>,
}

impl From<&Library> for LibrarySummary {
    fn from(library: &Library) -> Self {
        Self {
            lib_code: library.lib_code,
            lib_name: library.lib_name.clone(),
            address: library.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookWithLibraries {
    pub isbn: String,
    pub title: String,
    pub cover: String,
    pub libraries: Vec<LibrarySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub isbn: String,
    pub title: String,
    pub cover: String,
}

/// Library-centric view of an optimal set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryWithBooks {
    pub lib_code: LibraryCode,
    pub lib_name: String,
    pub address: Option<String>,
    pub books: Vec<BookSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalLibrarySet {
    pub books: Vec<BookWithLibraries>,
    pub coverage_rate: f64,
}

impl OptimalLibrarySet {
    /// Distinct libraries contributing at least one book.
    pub fn library_count(&self) -> usize {
        self.books
            .iter()
            .flat_map(|book| book.libraries.iter().map(|l| l.lib_code))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Regroups the set by library, in order of first appearance.
    pub fn libraries(&self) -> Vec<LibraryWithBooks> {
        let mut grouped: Vec<LibraryWithBooks> = Vec::new();

        for book in &self.books {
            for library in &book.libraries {
                let summary = BookSummary {
                    isbn: book.isbn.clone(),
                    title: book.title.clone(),
                    cover: book.cover.clone(),
                };
                match grouped.iter_mut().find(|g| g.lib_code == library.lib_code) {
                    Some(group) => group.books.push(summary),
                    None => grouped.push(LibraryWithBooks {
                        lib_code: library.lib_code,
                        lib_name: library.lib_name.clone(),
                        address: library.address.clone(),
                        books: vec![summary],
                    }),
                }
            }
        }

        grouped
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn coverage_rate(covered: usize, requested: usize) -> f64 {
    if requested == 0 {
        return 0.0;
    }
    round2(covered as f64 / requested as f64 * 100.0)
}

/// Lexicographic k-combinations of a slice.
pub struct Combinations<'a, T> {
    pool: &'a [T],
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

pub fn combinations<T>(pool: &[T], size: usize) -> Combinations<'_, T> {
    Combinations {
        pool,
        indices: (0..size).collect(),
        started: false,
        done: size == 0 || size > pool.len(),
    }
}

impl<'a, T> Combinations<'a, T> {
    fn advance(&mut self) -> bool {
        let n = self.pool.len();
        let k = self.indices.len();

        // rightmost index that can still move
        let Some(i) = (0..k).rev().find(|&i| self.indices[i] < n - k + i) else {
            return false;
        };

        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        true
    }
}

impl<'a, T> Iterator for Combinations<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.started {
            if !self.advance() {
                self.done = true;
                return None;
            }
        } else {
            self.started = true;
        }

        Some(self.indices.iter().map(|&i| &self.pool[i]).collect())
    }
}

// Scored combination, materialized into an OptimalLibrarySet only if it ranks
struct Candidate<'a> {
    members: Vec<&'a Library>,
    covered: Vec<&'a str>,
    coverage_rate: f64,
    library_count: usize,
}

fn score_combination<'a>(
    members: Vec<&'a Library>,
    requested: &HashSet<&str>,
    requested_count: usize,
    index: &'a HoldingIndex,
) -> Option<Candidate<'a>> {
    let mut covered: Vec<&'a str> = Vec::new();
    let mut contributing: BTreeSet<LibraryCode> = BTreeSet::new();

    for library in &members {
        for isbn in index.books_held_by(library.lib_code) {
            if !requested.contains(isbn.as_str()) {
                continue;
            }
            contributing.insert(library.lib_code);
            if !covered.contains(&isbn.as_str()) {
                covered.push(isbn.as_str());
            }
        }
    }

    if covered.is_empty() {
        return None;
    }

    Some(Candidate {
        coverage_rate: coverage_rate(covered.len(), requested_count),
        library_count: contributing.len(),
        members,
        covered,
    })
}

fn materialize(
    candidate: Candidate<'_>,
    index: &HoldingIndex,
    metadata: &HashMap<String, BookMetadata>,
) -> OptimalLibrarySet {
    let books = candidate
        .covered
        .iter()
        .map(|&isbn| {
            let book = metadata
                .get(isbn)
                .cloned()
                .unwrap_or_else(|| BookMetadata::placeholder(isbn));
            BookWithLibraries {
                isbn: isbn.to_string(),
                title: book.title,
                cover: book.cover,
                libraries: candidate
                    .members
                    .iter()
                    .filter(|library| index.holds(library.lib_code, isbn))
                    .map(|library| LibrarySummary::from(*library))
                    .collect(),
            }
        })
        .collect();

    OptimalLibrarySet {
        books,
        coverage_rate: candidate.coverage_rate,
    }
}

/// Finds the best library sets for `requested`.
///
/// Every combination of 1..=5 libraries holding at least one requested book is
/// scored; sets are ordered by coverage rate (desc), then by the number of
/// distinct libraries used (asc), with enumeration order kept for full ties.
/// At most MAX_OPTIMAL_SETS are returned.
pub fn find_optimal_sets(
    requested: &[String],
    libraries: &[Library],
    index: &HoldingIndex,
    books: &HashMap<String, BookMetadata>,
) -> Vec<OptimalLibrarySet> {
    if index.is_empty() {
        return Vec::new();
    }

    let requested_set: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let valid: Vec<&Library> = libraries
        .iter()
        .filter(|library| index.has_library(library.lib_code))
        .collect();

    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    for size in 1..=MAX_COMBINATION_SIZE.min(valid.len()) {
        for combination in combinations(&valid, size) {
            let members = combination.into_iter().copied().collect();
            if let Some(candidate) =
                score_combination(members, &requested_set, requested.len(), index)
            {
                candidates.push(candidate);
            }
        }
    }

    tracing::debug!(
        valid_libraries = valid.len(),
        candidates = candidates.len(),
        "combination search finished"
    );

    candidates.sort_by(|a, b| {
        b.coverage_rate
            .total_cmp(&a.coverage_rate)
            .then_with(|| a.library_count.cmp(&b.library_count))
    });

    candidates
        .into_iter()
        .take(MAX_OPTIMAL_SETS)
        .map(|candidate| materialize(candidate, index, books))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holdings::HoldingLibrary;
    use rand::Rng;

    fn isbns(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn index_of(directory: &[Library], holdings: &[(&str, Vec<LibraryCode>)]) -> HoldingIndex {
        let owned: Vec<(&str, Vec<HoldingLibrary>)> = holdings
            .iter()
            .map(|(isbn, codes)| {
                let libs = codes
                    .iter()
                    .map(|code| HoldingLibrary::new(code.to_string().as_str(), "external"))
                    .collect();
                (*isbn, libs)
            })
            .collect();
        HoldingIndex::build(
            directory,
            owned.iter().map(|(isbn, libs)| (*isbn, libs.as_slice())),
        )
    }

    fn directory(codes: &[LibraryCode]) -> Vec<Library> {
        codes
            .iter()
            .map(|&code| Library::new(code, format!("Library {code}")).with_address("Seoul"))
            .collect()
    }

    #[test]
    fn test_combination_counts() {
        let pool: Vec<u32> = (0..7).collect();
        assert_eq!(combinations(&pool, 1).count(), 7);
        assert_eq!(combinations(&pool, 3).count(), 35);
        assert_eq!(combinations(&pool, 7).count(), 1);
        assert_eq!(combinations(&pool, 8).count(), 0);
        assert_eq!(combinations(&pool, 0).count(), 0);
    }

    #[test]
    fn test_combinations_are_lexicographic() {
        let pool = ['a', 'b', 'c', 'd'];
        let pairs: Vec<String> = combinations(&pool, 2)
            .map(|c| c.into_iter().collect())
            .collect();
        assert_eq!(pairs, vec!["ab", "ac", "ad", "bc", "bd", "cd"]);
    }

    #[test]
    fn test_round2() {
        assert_eq!(coverage_rate(1, 3), 33.33);
        assert_eq!(coverage_rate(2, 3), 66.67);
        assert_eq!(coverage_rate(1, 2), 50.0);
        assert_eq!(coverage_rate(3, 3), 100.0);
        assert_eq!(round2(coverage_rate(1, 3)), coverage_rate(1, 3));
    }

    #[test]
    fn test_single_book_single_library() {
        let libraries = directory(&[111001, 111002]);
        let index = index_of(&libraries, &[("isbn-a", vec![111001])]);
        let mut books = HashMap::new();
        books.insert(
            "isbn-a".to_string(),
            BookMetadata {
                title: "Title A".to_string(),
                cover: "cover-a.jpg".to_string(),
            },
        );

        let sets = find_optimal_sets(&isbns(&["isbn-a"]), &libraries, &index, &books);

        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].coverage_rate, 100.0);
        assert_eq!(sets[0].books.len(), 1);
        assert_eq!(sets[0].books[0].isbn, "isbn-a");
        assert_eq!(sets[0].books[0].title, "Title A");
        assert_eq!(sets[0].books[0].libraries.len(), 1);
        assert_eq!(sets[0].books[0].libraries[0].lib_code, 111001);
        assert_eq!(sets[0].books[0].libraries[0].address.as_deref(), Some("Seoul"));
    }

    #[test]
    fn test_disjoint_holders_need_both_libraries() {
        let libraries = directory(&[1, 2]);
        let index = index_of(&libraries, &[("isbn-a", vec![1]), ("isbn-b", vec![2])]);

        let requested = isbns(&["isbn-a", "isbn-b"]);
        let sets = find_optimal_sets(&requested, &libraries, &index, &HashMap::new());

        assert_eq!(sets.len(), 3);
        let top = &sets[0];
        assert_eq!(top.coverage_rate, 100.0);
        assert_eq!(top.library_count(), 2);

        let grouped = top.libraries();
        assert_eq!(grouped.len(), 2);
        let x = grouped.iter().find(|l| l.lib_code == 1).unwrap();
        let y = grouped.iter().find(|l| l.lib_code == 2).unwrap();
        assert_eq!(x.books.iter().map(|b| b.isbn.as_str()).collect::<Vec<_>>(), ["isbn-a"]);
        assert_eq!(y.books.iter().map(|b| b.isbn.as_str()).collect::<Vec<_>>(), ["isbn-b"]);

        assert_eq!(sets[1].coverage_rate, 50.0);
        assert_eq!(sets[2].coverage_rate, 50.0);
    }

    #[test]
    fn test_fewer_libraries_win_at_equal_coverage() {
        let libraries = directory(&[1, 2, 3]);
        // library 3 alone covers everything
        let index = index_of(
            &libraries,
            &[("isbn-a", vec![1, 3]), ("isbn-b", vec![2, 3])],
        );

        let requested = isbns(&["isbn-a", "isbn-b"]);
        let sets = find_optimal_sets(&requested, &libraries, &index, &HashMap::new());

        assert_eq!(sets[0].coverage_rate, 100.0);
        assert_eq!(sets[0].library_count(), 1);
        assert_eq!(sets[0].books[0].libraries[0].lib_code, 3);
        assert!(sets.iter().all(|s| s.coverage_rate == 100.0));
        assert!(sets[1].library_count() >= 2);
    }

    #[test]
    fn test_book_libraries_are_limited_to_the_combination() {
        let libraries = directory(&[1, 2, 3]);
        let index = index_of(&libraries, &[("isbn-a", vec![1, 2, 3])]);

        let sets = find_optimal_sets(&isbns(&["isbn-a"]), &libraries, &index, &HashMap::new());

        // singletons first, each listing only its own library
        for set in &sets[..3] {
            assert_eq!(set.books[0].libraries.len(), 1);
        }
        assert_eq!(sets[3].books[0].libraries.len(), 2);
    }

    #[test]
    fn test_no_holders_gives_no_sets() {
        let libraries = directory(&[1, 2]);
        let index = index_of(&libraries, &[("isbn-a", vec![999])]);

        let sets = find_optimal_sets(&isbns(&["isbn-a"]), &libraries, &index, &HashMap::new());
        assert!(sets.is_empty());
    }

    #[test]
    fn test_missing_metadata_uses_placeholder() {
        let libraries = directory(&[1]);
        let index = index_of(&libraries, &[("isbn-a", vec![1])]);

        let sets = find_optimal_sets(&isbns(&["isbn-a"]), &libraries, &index, &HashMap::new());
        assert_eq!(sets[0].books[0].title, "Book isbn-a");
        assert_eq!(sets[0].books[0].cover, "");
    }

    #[test]
    fn test_partial_coverage_rate() {
        let libraries = directory(&[1]);
        let index = index_of(&libraries, &[("isbn-a", vec![1])]);

        let sets = find_optimal_sets(
            &isbns(&["isbn-a", "isbn-b", "isbn-c"]),
            &libraries,
            &index,
            &HashMap::new(),
        );
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].coverage_rate, 33.33);
    }

    #[test]
    fn test_combination_size_is_capped_at_five() {
        let codes: Vec<LibraryCode> = (1..=8).collect();
        let libraries = directory(&codes);
        // every library holds a different share of the three books
        let index = index_of(
            &libraries,
            &[
                ("isbn-a", vec![1, 2, 3]),
                ("isbn-b", vec![4, 5, 6]),
                ("isbn-c", vec![7, 8]),
            ],
        );

        let sets = find_optimal_sets(
            &isbns(&["isbn-a", "isbn-b", "isbn-c"]),
            &libraries,
            &index,
            &HashMap::new(),
        );

        assert_eq!(sets.len(), MAX_OPTIMAL_SETS);
        assert!(sets.iter().all(|s| s.library_count() <= MAX_COMBINATION_SIZE));
        assert_eq!(sets[0].coverage_rate, 100.0);
        assert_eq!(sets[0].library_count(), 3);
    }

    #[test]
    fn test_randomized_ranking_invariants() {
        let mut rng = rand::thread_rng();
        let requested = isbns(&["isbn-a", "isbn-b", "isbn-c"]);

        for _ in 0..50 {
            let codes: Vec<LibraryCode> = (1..=rng.gen_range(1..=9)).collect();
            let libraries = directory(&codes);
            let mut index = HoldingIndex::default();
            for isbn in &requested {
                for &code in &codes {
                    if rng.gen_bool(0.3) {
                        index.insert(isbn, code);
                    }
                }
            }

            let sets = find_optimal_sets(&requested, &libraries, &index, &HashMap::new());

            assert!(sets.len() <= MAX_OPTIMAL_SETS);
            assert_eq!(sets.is_empty(), index.is_empty());
            for set in &sets {
                assert!((0.0..=100.0).contains(&set.coverage_rate));
                assert!(!set.books.is_empty());
            }
            for pair in sets.windows(2) {
                assert!(pair[0].coverage_rate >= pair[1].coverage_rate);
                if pair[0].coverage_rate == pair[1].coverage_rate {
                    assert!(pair[0].library_count() <= pair[1].library_count());
                }
            }
        }
    }
}
