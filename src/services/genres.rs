//! Free-text genre classification.
//!
//! Broadcasters tag their listings with an in-house genre vocabulary; the
//! host wants the fixed numeric scheme. Each adapter carries a static label
//! table plus a policy for labels the table does not know.

use crate::models::Genre;

/// How a label without a table entry is carried into the genre description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherLabelStyle {
    /// Pass the label through untouched.
    Verbatim,
    /// Title-case the label ("GAME SHOW" becomes "Game Show").
    TitleCase,
}

/// Static genre lookup table for one broadcaster.
pub struct GenreTable {
    entries: &'static [(&'static str, (i32, i32))],
    other_style: OtherLabelStyle,
}

impl GenreTable {
    pub const fn new(
        entries: &'static [(&'static str, (i32, i32))],
        other_style: OtherLabelStyle,
    ) -> Self {
        Self {
            entries,
            other_style,
        }
    }

    /// Classify a listing's genre labels.
    ///
    /// The first label with a table entry wins, even when an unknown label
    /// precedes it. With no table match anywhere, the first unknown label
    /// becomes the genre description. With no labels at all the result is
    /// all zeroes.
    pub fn classify<'a, I>(&self, labels: I) -> Genre
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut other: Option<&str> = None;
        for label in labels {
            if let Some(&(_, (genre_type, genre_sub_type))) =
                self.entries.iter().find(|(text, _)| *text == label)
            {
                return Genre::from_table(genre_type, genre_sub_type);
            }
            if other.is_none() {
                other = Some(label);
            }
        }

        match other {
            Some(label) => Genre::other(self.normalize(label)),
            None => Genre::default(),
        }
    }

    fn normalize(&self, label: &str) -> String {
        match self.other_style {
            OtherLabelStyle::Verbatim => label.to_string(),
            OtherLabelStyle::TitleCase => title_case(label),
        }
    }
}

/// Uppercase the first letter of every word, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GENRE_USE_STRING;

    const TABLE: GenreTable = GenreTable::new(
        &[("Drama", (0x10, 0x00)), ("News", (0x20, 0x00))],
        OtherLabelStyle::Verbatim,
    );

    #[test]
    fn table_match_beats_earlier_unknown_label() {
        let genre = TABLE.classify(["Unknown Genre X", "Drama"]);
        assert_eq!(genre, Genre::from_table(0x10, 0x00));
        assert!(genre.description.is_empty());
    }

    #[test]
    fn first_table_match_wins_in_input_order() {
        let genre = TABLE.classify(["News", "Drama"]);
        assert_eq!(genre, Genre::from_table(0x20, 0x00));
    }

    #[test]
    fn unknown_label_alone_becomes_description() {
        let genre = TABLE.classify(["Unknown Genre X"]);
        assert_eq!(genre.genre_type, GENRE_USE_STRING);
        assert_eq!(genre.genre_sub_type, 0);
        assert_eq!(genre.description, "Unknown Genre X");
    }

    #[test]
    fn first_unknown_label_is_kept() {
        let genre = TABLE.classify(["First Unknown", "Second Unknown"]);
        assert_eq!(genre.description, "First Unknown");
    }

    #[test]
    fn no_labels_is_all_zeroes() {
        let genre = TABLE.classify(Vec::<&str>::new());
        assert_eq!(genre, Genre::default());
    }

    #[test]
    fn title_case_normalization() {
        const SHOUTING: GenreTable = GenreTable::new(&[], OtherLabelStyle::TitleCase);
        let genre = SHOUTING.classify(["OTHER SPORTS/FITNESS"]);
        assert_eq!(genre.description, "Other Sports/Fitness");
    }

    #[test]
    fn title_case_handles_apostrophes_like_word_breaks() {
        assert_eq!(title_case("CHILDREN'S ANIMATED"), "Children'S Animated");
    }
}
