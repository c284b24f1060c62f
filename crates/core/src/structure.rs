use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::Section;
use regex::Regex;

const HEADER_PATTERN: &str = concat!(
    r"(?i)^(?:abstract|introduction|background|related\s+work|methodology|methods|approach",
    r"|experiments?|results?|evaluation|discussion|conclusion|future\s+work|references",
    r"|bibliography)\s*$",
    r"|^\d+\.?\s+[A-Z][a-z]+",
);
const NUMBERING_PATTERN: &str = r"^\d+\.?\s*";
const MAX_HEADER_CHARS: usize = 100;
const MAX_UPPERCASE_HEADER_WORDS: usize = 5;

pub const DEFAULT_SECTION: &str = "Introduction";
pub const FULL_DOCUMENT_SECTION: &str = "Full Document";

/// Canonical labels, checked in order; the first keyword found in the
/// lower-cased header wins.
const CANONICAL_SECTIONS: [(&[&str], &str); 12] = [
    (&["abstract"], "Abstract"),
    (&["introduction", "intro"], "Introduction"),
    (&["background"], "Background"),
    (&["related"], "Related Work"),
    (&["method", "approach"], "Methodology"),
    (&["experiment"], "Experiments"),
    (&["result"], "Results"),
    (&["evaluation"], "Evaluation"),
    (&["discussion"], "Discussion"),
    (&["conclusion"], "Conclusion"),
    (&["future"], "Future Work"),
    (&["reference", "bibliography"], "References"),
];

/// Splits per-page text of a research paper into named sections.
#[derive(Debug, Clone)]
pub struct SectionDetector {
    header_re: Regex,
    numbering_re: Regex,
}

impl SectionDetector {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            header_re: Regex::new(HEADER_PATTERN)?,
            numbering_re: Regex::new(NUMBERING_PATTERN)?,
        })
    }

    pub fn is_section_header(&self, line: &str) -> bool {
        if line.is_empty() || line.chars().count() > MAX_HEADER_CHARS {
            return false;
        }

        if self.header_re.is_match(line) {
            return true;
        }

        is_all_uppercase(line) && line.split_whitespace().count() <= MAX_UPPERCASE_HEADER_WORDS
    }

    pub fn normalize_section_name(&self, header: &str) -> String {
        let lowered = header.trim().to_lowercase();
        let stripped = self.numbering_re.replace(&lowered, "");

        CANONICAL_SECTIONS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|keyword| stripped.contains(keyword)))
            .map(|(_, label)| (*label).to_string())
            .unwrap_or_else(|| title_case(header))
    }

    /// Scans lines in page order and cuts a new section at every header line.
    /// Header lines themselves are not part of any section's text.
    pub fn detect_sections(&self, pages: &[PageText]) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut current = Section {
            name: DEFAULT_SECTION.to_string(),
            text: String::new(),
            page_start: 1,
            page_end: 1,
        };

        for page in pages {
            for line in page.text.split('\n') {
                let stripped = line.trim();

                if self.is_section_header(stripped) {
                    let next = Section {
                        name: self.normalize_section_name(stripped),
                        text: String::new(),
                        page_start: page.number,
                        page_end: page.number,
                    };
                    let mut finished = std::mem::replace(&mut current, next);
                    if !finished.text.trim().is_empty() {
                        finished.page_end = page.number;
                        sections.push(finished);
                    }
                } else {
                    current.text.push_str(line);
                    current.text.push('\n');
                    current.page_end = page.number;
                }
            }
        }

        if !current.text.trim().is_empty() {
            sections.push(current);
        }

        if sections.is_empty() {
            let text = pages
                .iter()
                .map(|page| page.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let last_page = pages.last().map(|page| page.number).unwrap_or(1).max(1);
            sections.push(Section {
                name: FULL_DOCUMENT_SECTION.to_string(),
                text,
                page_start: 1,
                page_end: last_page,
            });
        }

        sections
    }
}

fn is_all_uppercase(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

fn title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for ch in text.chars() {
        if previous_is_letter {
            titled.extend(ch.to_lowercase());
        } else {
            titled.extend(ch.to_uppercase());
        }
        previous_is_letter = ch.is_alphabetic();
    }

    titled
}
