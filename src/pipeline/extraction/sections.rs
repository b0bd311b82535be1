use regex::Regex;

/// Section headers that end a free-text section such as `Plan:`.
pub const DEFAULT_SECTION_TERMINATORS: &[&str] = &[
    "Impression",
    "Assessment",
    "Diagnosis",
    "Physical Exam",
    "Examination",
    "Vital Signs",
    "Vitals",
    "History",
    "Chief Complaint",
    "Medications",
    "Allergies",
    "Follow-up",
];

/// Named-section boundary list used to stop run-on captures.
///
/// A terminator counts as a section header when it is followed by `:`, or
/// when it stands alone on its own line. `Impression` may also be followed
/// by `,` (as in `Impression, HTN`). A header at the very start of the text
/// belongs to the section's own content and never ends it, and a bare word
/// in the middle of a sentence (`Monitor vitals, repeat labs`) does not
/// either.
#[derive(Debug, Clone)]
pub struct SectionBoundaries {
    names: Vec<String>,
    header: Option<Regex>,
}

impl SectionBoundaries {
    /// Build a boundary list from section names. Names are matched
    /// case-insensitively; internal whitespace matches any run of spaces.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|n| !n.trim().is_empty())
            .collect();
        let header = build_header_regex(&names);
        Self { names, header }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Byte offset of the first section header in `text` that has content
    /// before it, if any.
    pub fn find_first(&self, text: &str) -> Option<usize> {
        self.header
            .as_ref()?
            .find_iter(text)
            .map(|m| m.start())
            .find(|&start| !text[..start].trim().is_empty())
    }

    /// `text` up to (not including) the first section header.
    pub fn cut<'a>(&self, text: &'a str) -> &'a str {
        match self.find_first(text) {
            Some(end) => &text[..end],
            None => text,
        }
    }
}

impl Default for SectionBoundaries {
    fn default() -> Self {
        Self::new(DEFAULT_SECTION_TERMINATORS.iter().copied())
    }
}

fn build_header_regex(names: &[String]) -> Option<Regex> {
    if names.is_empty() {
        return None;
    }

    let alternation = names
        .iter()
        .map(|n| {
            n.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");

    let mut pattern = format!(
        r"(?im)^[ \t]*(?:{alternation})[ \t]*(?::|\r?$)|\b(?:{alternation})[ \t]*:"
    );
    if names.iter().any(|n| n.trim().eq_ignore_ascii_case("impression")) {
        pattern.push_str(r"|\bImpression[ \t]*,");
    }
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, "Section boundary pattern rejected, boundaries disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_impression_header() {
        let b = SectionBoundaries::default();
        let tail = " Start lisinopril 10mg daily. Impression: Hypertension";
        assert_eq!(b.cut(tail).trim(), "Start lisinopril 10mg daily.");
    }

    #[test]
    fn stops_at_header_on_new_line() {
        let b = SectionBoundaries::default();
        let tail = " Rest and fluids\nAssessment\nViral URI";
        assert_eq!(b.cut(tail).trim(), "Rest and fluids");
    }

    #[test]
    fn word_inside_sentence_is_not_a_header() {
        let b = SectionBoundaries::default();
        let tail = " Review history with family. Increase fluids";
        assert_eq!(b.cut(tail), tail);
    }

    #[test]
    fn capital_i_alone_does_not_truncate() {
        let b = SectionBoundaries::default();
        let tail = " Ice packs. Ibuprofen 400mg PRN";
        assert_eq!(b.cut(tail), tail);
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let b = SectionBoundaries::default();
        assert_eq!(b.cut("Fluids. IMPRESSION: flu").trim(), "Fluids.");
    }

    #[test]
    fn multi_word_names_match_any_spacing() {
        let b = SectionBoundaries::new(["Physical Exam"]);
        assert_eq!(b.cut("Rest. Physical   Exam: normal").trim(), "Rest.");
    }

    #[test]
    fn custom_list_replaces_defaults() {
        let b = SectionBoundaries::new(["Disposition"]);
        assert_eq!(b.cut("Fluids. Impression: flu"), "Fluids. Impression: flu");
        assert_eq!(b.cut("Fluids. Disposition: home").trim(), "Fluids.");
        assert_eq!(b.names(), &["Disposition".to_string()]);
    }

    #[test]
    fn leading_header_word_is_plan_content() {
        let b = SectionBoundaries::default();
        for tail in [
            " Follow-up in 2 weeks with cardiology",
            " History and labs review tomorrow",
            "\n  Vitals q4h overnight",
        ] {
            assert_eq!(b.cut(tail), tail);
        }
    }

    #[test]
    fn leading_header_word_still_stops_at_later_header() {
        let b = SectionBoundaries::default();
        let tail = " Follow-up in 2 weeks. Impression: stable angina";
        assert_eq!(b.cut(tail).trim(), "Follow-up in 2 weeks.");
    }

    #[test]
    fn header_word_before_comma_is_not_a_header() {
        let b = SectionBoundaries::default();
        let tail = " Monitor vitals, repeat labs in 6h, start IV fluids";
        assert_eq!(b.cut(tail), tail);
        let tail = " Reconcile medications, allergies, and diet";
        assert_eq!(b.cut(tail), tail);
    }

    #[test]
    fn impression_with_comma_is_a_header() {
        let b = SectionBoundaries::default();
        assert_eq!(b.cut(" CXR. Impression, pneumonia").trim(), "CXR.");
        let custom = SectionBoundaries::new(["Disposition"]);
        assert_eq!(custom.cut(" CXR. Impression, pneumonia"), " CXR. Impression, pneumonia");
    }

    #[test]
    fn header_on_own_line_with_trailing_words_is_not_a_header() {
        let b = SectionBoundaries::default();
        let tail = " Rest\nHistory of asthma noted";
        assert_eq!(b.cut(tail), tail);
    }

    #[test]
    fn empty_list_never_cuts() {
        let b = SectionBoundaries::new(Vec::<String>::new());
        assert_eq!(b.find_first("Impression: flu"), None);
    }
}
