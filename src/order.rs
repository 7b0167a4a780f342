use std::collections::{BTreeMap, HashSet};

use crate::title::{HeadingClass, Ordinal, classify_heading, extract_ordinal, normalize};

/// Policy token that expands into every chapter, with parts interleaved.
pub const EXPAND_PARTS: &str = "PARTES";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingPolicy {
    pub sequence: Vec<String>,
    pub part_starts: BTreeMap<u64, u64>,
}

impl OrderingPolicy {
    fn part_starting_at(&self, chapter: u64) -> Option<u64> {
        self.part_starts
            .iter()
            .find(|(_, start)| **start == chapter)
            .map(|(part, _)| *part)
    }
}

pub fn resolve_order<S: AsRef<str>>(policy: &OrderingPolicy, available: &[S]) -> Vec<String> {
    let mut chapters = Vec::new();
    let mut parts = Vec::new();
    for title in available {
        let title = title.as_ref();
        match classify_heading(title) {
            HeadingClass::Chapter => chapters.push((extract_ordinal(title), title)),
            HeadingClass::Part => parts.push((extract_ordinal(title), title)),
            HeadingClass::Other => {}
        }
    }
    // Stable: chapters sharing an ordinal keep discovery order.
    chapters.sort_by_key(|(ordinal, _)| *ordinal);

    let mut order = Vec::new();
    let mut emitted_parts = HashSet::new();

    for token in &policy.sequence {
        if token != EXPAND_PARTS {
            order.push(normalize(token));
            continue;
        }

        for (ordinal, chapter) in &chapters {
            if let Some(part_title) = part_for_chapter(policy, &parts, *ordinal) {
                let key = normalize(part_title);
                if emitted_parts.insert(key.clone()) {
                    order.push(key);
                }
            }
            order.push(normalize(chapter));
        }
    }

    order
}

fn part_for_chapter<'a>(
    policy: &OrderingPolicy,
    parts: &[(Ordinal, &'a str)],
    chapter: Ordinal,
) -> Option<&'a str> {
    let part_number = policy.part_starting_at(chapter.number()?)?;
    let found = parts
        .iter()
        .find(|(ordinal, _)| *ordinal == Ordinal::Number(part_number))
        .map(|(_, title)| *title);
    if found.is_none() {
        tracing::debug!(
            part = part_number,
            chapter = %chapter,
            "no part title available for configured part start"
        );
    }
    found
}
