//! Confusable-language groups: symmetric, non-hierarchical sets of
//! ISO-639-3 tags between which the classifier by design reports only
//! group-level confidence.

use std::collections::HashMap;

/// The declared confusable groups. Each inner slice has at least two tags;
/// groups never overlap.
pub const GROUPS: &[&[&str]] = &[
    &["nob", "nno", "nor", "dan"],          // Scandinavian
    &["hrv", "srp", "bos", "hbs"],          // South Slavic
    &["msa", "zlm", "zsm", "ind"],          // Malay/Indonesian
    &["ara", "arz", "acm", "apc"],          // Arabic varieties
    &["fas", "pes", "prs"],                 // Persian
    &["zho", "cmn", "wuu", "yue"],          // Mandarin/generic Chinese
    &["aze", "azj"],                        // Azerbaijani
    &["est", "vro"],                        // Estonian
    &["lav", "ltg"],                        // Latvian
    &["mlg", "plt"],                        // Malagasy
    &["mon", "khk"],                        // Mongolian
    &["yid", "ydd"],                        // Yiddish
    &["sme", "smj", "sma"],                 // Sami
    &["sqi", "als"],                        // Albanian
    &["tat", "bak"],                        // Tatar/Bashkir
    &["ita", "vec"],                        // Italian/Venetian
    &["spa", "arg", "ast"],                 // Spanish/Aragonese/Asturian
    &["por", "glg"],                        // Portuguese/Galician
    &["ces", "slk"],                        // Czech/Slovak
    &["bel", "rus", "ukr"],                 // East Slavic
];

/// Group memberships compiled once per loaded model into per-class lookups.
///
/// `group_of[class]` is the group id for that class, or `None` if the class
/// is a singleton. `groups[group_id]` lists the class indices of every
/// member, in the order they appear in the model's label list.
pub struct GroupTable {
    group_of: Vec<Option<u16>>,
    groups: Vec<Vec<u32>>,
}

impl GroupTable {
    /// Compile the static [`GROUPS`] table against a model's label list.
    /// Labels absent from `labels` are simply skipped; classes not covered
    /// by any group stay `None` (singleton behavior).
    pub fn compile(labels: &[String]) -> Self {
        let mut label_to_class: HashMap<&str, u32> = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            label_to_class.insert(label.as_str(), i as u32);
        }

        let mut group_of = vec![None; labels.len()];
        let mut groups = Vec::new();

        for group in GROUPS {
            let members: Vec<u32> = group
                .iter()
                .filter_map(|tag| label_to_class.get(tag).copied())
                .collect();
            if members.len() < 2 {
                continue;
            }
            let group_id = groups.len() as u16;
            for &class in &members {
                group_of[class as usize] = Some(group_id);
            }
            groups.push(members);
        }

        GroupTable { group_of, groups }
    }

    pub fn group_of(&self, class: usize) -> Option<u16> {
        self.group_of.get(class).copied().flatten()
    }

    pub fn members(&self, group_id: u16) -> &[u32] {
        &self.groups[group_id as usize]
    }

    /// Redistribute probability mass within each group to its top scorer,
    /// zeroing the rest. Output length equals `probs.len()`; `probs` is not
    /// mutated.
    pub fn collapse(&self, probs: &[f32]) -> Vec<f32> {
        let mut out = probs.to_vec();
        for members in &self.groups {
            let total: f32 = members.iter().map(|&c| probs[c as usize]).sum();
            let top = *members
                .iter()
                .max_by(|&&a, &&b| {
                    probs[a as usize]
                        .partial_cmp(&probs[b as usize])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .expect("group has at least two members");
            for &c in members {
                out[c as usize] = 0.0;
            }
            out[top as usize] = total;
        }
        out
    }

    /// True if `actual` and `predicted` are equal, or share a group.
    pub fn is_lenient_match(&self, actual: &str, predicted: &str, labels: &[String]) -> bool {
        if actual == predicted {
            return true;
        }
        let actual_class = labels.iter().position(|l| l == actual);
        let predicted_class = labels.iter().position(|l| l == predicted);
        match (actual_class, predicted_class) {
            (Some(a), Some(p)) => match (self.group_of(a), self.group_of(p)) {
                (Some(ga), Some(gp)) => ga == gp,
                _ => false,
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["eng", "hrv", "srp", "bos", "deu"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn singleton_classes_have_no_group() {
        let table = GroupTable::compile(&labels());
        assert_eq!(table.group_of(0), None); // eng
        assert_eq!(table.group_of(4), None); // deu
    }

    #[test]
    fn south_slavic_classes_share_a_group() {
        let table = GroupTable::compile(&labels());
        let hrv = table.group_of(1);
        let srp = table.group_of(2);
        let bos = table.group_of(3);
        assert!(hrv.is_some());
        assert_eq!(hrv, srp);
        assert_eq!(hrv, bos);
    }

    #[test]
    fn collapse_preserves_total_mass() {
        let table = GroupTable::compile(&labels());
        let probs = vec![0.1, 0.2, 0.3, 0.05, 0.35];
        let collapsed = table.collapse(&probs);
        let before: f32 = probs.iter().sum();
        let after: f32 = collapsed.iter().sum();
        assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn collapse_gives_all_mass_to_top_scorer() {
        let table = GroupTable::compile(&labels());
        let probs = vec![0.1, 0.2, 0.3, 0.05, 0.35];
        let collapsed = table.collapse(&probs);
        // srp (index 2) has the highest raw prob among {hrv, srp, bos}.
        assert_eq!(collapsed[2], 0.2 + 0.3 + 0.05);
        assert_eq!(collapsed[1], 0.0);
        assert_eq!(collapsed[3], 0.0);
        // Non-grouped classes are untouched.
        assert_eq!(collapsed[0], 0.1);
        assert_eq!(collapsed[4], 0.35);
    }

    #[test]
    fn is_lenient_match_is_reflexive_and_symmetric() {
        let labels = labels();
        let table = GroupTable::compile(&labels);
        assert!(table.is_lenient_match("hrv", "hrv", &labels));
        assert!(table.is_lenient_match("hrv", "srp", &labels));
        assert!(table.is_lenient_match("srp", "hrv", &labels));
        assert!(!table.is_lenient_match("eng", "deu", &labels));
    }
}
