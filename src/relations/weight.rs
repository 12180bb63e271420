//! Position weights
//!
//! Mentions near the start of an abstract say more about the resource than
//! mentions near its end. Sections are ranked in first-seen order and
//! damped by `1 - (i / n) / 10`; within the document a mention is weighted by
//! its relative distance from the start.

use crate::error::Result;
use crate::models::{RelationRecord, SectionInfo};
use crate::utils::round_to;

/// Computes section degradation and relation weights for one resource
#[derive(Debug, Clone, Default)]
pub struct SectionWeightCalculator {
    sections: Vec<(String, SectionInfo)>,
}

impl SectionWeightCalculator {
    /// Collect the distinct sections of a relation set, in first-seen order
    pub fn from_relations(relations: &[RelationRecord]) -> Result<Self> {
        let mut sections: Vec<(String, SectionInfo)> = Vec::new();
        for relation in relations {
            if sections.iter().any(|(id, _)| id == &relation.section_id) {
                continue;
            }
            sections.push((relation.section_id.clone(), SectionInfo::parse(&relation.section_id)?));
        }

        let count = sections.len() as f64;
        for (index, (_, section)) in sections.iter_mut().enumerate() {
            section.degradation = 1.0 - (index as f64 / count) / 10.0;
        }

        Ok(Self { sections })
    }

    /// Sections with their degradation, in first-seen order
    pub fn sections(&self) -> Vec<SectionInfo> {
        self.sections.iter().map(|(_, s)| s.clone()).collect()
    }

    /// Largest section end boundary
    pub fn total_size(&self) -> u64 {
        self.sections.iter().map(|(_, s)| s.to).max().unwrap_or(0)
    }

    /// Degradation of a section, 1.0 for unknown sections
    pub fn degradation(&self, section_id: &str) -> f64 {
        self.sections
            .iter()
            .find(|(id, _)| id == section_id)
            .map(|(_, s)| s.degradation)
            .unwrap_or(1.0)
    }

    /// Weight of a mention starting at `begin_index` in `section_id`
    ///
    /// A mention starting past the last section boundary weighs 0.0 rather
    /// than going negative.
    pub fn weight(&self, begin_index: u64, section_id: &str) -> f64 {
        let total_size = self.total_size();
        let position_weight = if total_size == 0 {
            1.0
        } else {
            (1.0 - begin_index as f64 / total_size as f64).max(0.0)
        };
        round_to(position_weight * self.degradation(section_id), 4)
    }

    /// Fill the weight of every relation
    pub fn apply(&self, relations: &mut [RelationRecord]) {
        for relation in relations {
            relation.weight = Some(self.weight(relation.begin_index, &relation.section_id));
        }
    }
}

/// Weight a relation set in place and return its sections
pub fn assign_weights(relations: &mut [RelationRecord]) -> Result<Vec<SectionInfo>> {
    let calculator = SectionWeightCalculator::from_relations(relations)?;
    calculator.apply(relations);
    Ok(calculator.sections())
}
