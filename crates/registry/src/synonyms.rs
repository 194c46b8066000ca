//! Colloquial vocabulary expansion.
//!
//! Users rarely phrase requests with catalog category names: they ask about
//! "娃" or "kids" when the catalog says "学生管理". Each [`SynonymGroup`] maps a
//! set of aliases onto canonical terms that do appear in category names.
//!
//! Expansion rule for one keyword, applied in table order:
//! 1. the keyword itself is always the first term;
//! 2. every group with an alias equal to the keyword contributes its canonical terms;
//! 3. only when no group matched exactly, every group with an alias contained
//!    in the keyword contributes its canonical terms.
//!
//! Terms are deduplicated keeping first-seen order, so identical input always
//! expands identically.

use serde::{Deserialize, Serialize};
use tollgate_util::normalize_keyword;

/// One alias set and the canonical terms it expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymGroup {
    pub canonical: Vec<String>,
    pub aliases: Vec<String>,
}

impl SynonymGroup {
    pub fn new(canonical: &[&str], aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.iter().map(|term| term.to_lowercase()).collect(),
            aliases: aliases.iter().map(|alias| alias.to_lowercase()).collect(),
        }
    }

    fn matches_exactly(&self, keyword: &str) -> bool {
        self.canonical.iter().chain(self.aliases.iter()).any(|alias| alias == keyword)
    }

    fn is_contained_in(&self, keyword: &str) -> bool {
        self.canonical
            .iter()
            .chain(self.aliases.iter())
            .any(|alias| !alias.is_empty() && keyword.contains(alias.as_str()))
    }
}

/// Ordered synonym groups. Order matters only for the order of expanded terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    groups: Vec<SynonymGroup>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SynonymTable {
    pub fn new(groups: Vec<SynonymGroup>) -> Self {
        Self { groups }
    }

    /// The bundled vocabulary for kindergarten administration.
    pub fn builtin() -> Self {
        Self::new(vec![
            SynonymGroup::new(
                &["学生"],
                &[
                    "娃", "孩子", "小孩", "小朋友", "宝宝", "幼儿", "儿童", "学童", "student", "students", "kid", "kids",
                    "child", "children", "pupil", "pupils",
                ],
            ),
            SynonymGroup::new(
                &["班级"],
                &["班", "大班", "中班", "小班", "年级", "class", "classes", "classroom", "grade"],
            ),
            SynonymGroup::new(
                &["教师"],
                &["老师", "班主任", "园丁", "保育员", "teacher", "teachers", "staff", "educator"],
            ),
            SynonymGroup::new(
                &["家长"],
                &["爸爸", "妈妈", "父母", "监护人", "亲子", "parent", "parents", "guardian", "family"],
            ),
            SynonymGroup::new(
                &["活动"],
                &[
                    "运动会", "亲子", "节日", "庆典", "郊游", "春游", "秋游", "演出", "海报", "event", "events",
                    "activity", "activities",
                ],
            ),
            SynonymGroup::new(
                &["营销"],
                &["推广", "宣传", "海报", "二维码", "分享", "招生", "marketing", "campaign", "poster", "promotion", "qrcode"],
            ),
            SynonymGroup::new(
                &["考勤"],
                &["签到", "出勤", "请假", "缺勤", "到校", "attendance", "check-in", "absence", "absent"],
            ),
            SynonymGroup::new(
                &["通知"],
                &["公告", "消息", "提醒", "notice", "notification", "notifications", "announcement"],
            ),
        ])
    }

    /// Appends groups after the existing ones.
    pub fn extend(&mut self, groups: impl IntoIterator<Item = SynonymGroup>) {
        self.groups.extend(groups.into_iter().map(|group| SynonymGroup {
            canonical: group.canonical.iter().map(|term| term.to_lowercase()).collect(),
            aliases: group.aliases.iter().map(|alias| alias.to_lowercase()).collect(),
        }));
    }

    /// Expands one keyword. Blank input expands to nothing.
    pub fn expand(&self, keyword: &str) -> Vec<String> {
        let Some(keyword) = normalize_keyword(keyword) else {
            return Vec::new();
        };

        let mut terms = vec![keyword.clone()];
        let exact: Vec<&SynonymGroup> = self.groups.iter().filter(|group| group.matches_exactly(&keyword)).collect();
        let matched = if exact.is_empty() {
            self.groups.iter().filter(|group| group.is_contained_in(&keyword)).collect()
        } else {
            exact
        };
        for group in matched {
            push_unique(&mut terms, &group.canonical);
        }
        terms
    }

    /// Expands every keyword and deduplicates across them, keeping first-seen order.
    pub fn expand_all<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<String> {
        let mut terms = Vec::new();
        for keyword in keywords {
            push_unique(&mut terms, &self.expand(keyword.as_ref()));
        }
        terms
    }
}

fn push_unique(terms: &mut Vec<String>, candidates: &[String]) {
    for candidate in candidates {
        if !terms.contains(candidate) {
            terms.push(candidate.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colloquial_terms_expand_to_canonical_category_stems() {
        let table = SynonymTable::builtin();
        assert_eq!(table.expand("娃"), vec!["娃", "学生"]);
        assert_eq!(table.expand(" Kids "), vec!["kids", "学生"]);
    }

    #[test]
    fn ambiguous_alias_expands_to_every_group_in_table_order() {
        let table = SynonymTable::builtin();
        assert_eq!(table.expand("海报"), vec!["海报", "活动", "营销"]);
        assert_eq!(table.expand("亲子"), vec!["亲子", "家长", "活动"]);
    }

    #[test]
    fn containment_applies_only_without_exact_match() {
        let table = SynonymTable::builtin();
        assert_eq!(table.expand("小明的孩子"), vec!["小明的孩子", "学生"]);
        assert_eq!(table.expand("大班"), vec!["大班", "班级"]);
    }

    #[test]
    fn expand_all_deduplicates_in_first_seen_order() {
        let table = SynonymTable::builtin();
        let terms = table.expand_all(&["学生", "孩子", "", "查询"]);
        assert_eq!(terms, vec!["学生", "孩子", "查询"]);
    }

    #[test]
    fn extended_groups_are_lowercased_and_applied() {
        let mut table = SynonymTable::new(Vec::new());
        table.extend([SynonymGroup {
            canonical: vec!["Menu".into()],
            aliases: vec!["Lunch".into()],
        }]);
        assert_eq!(table.expand("lunch"), vec!["lunch", "menu"]);
    }
}
