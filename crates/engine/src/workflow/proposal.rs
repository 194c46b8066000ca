//! Drafts an [`ActivityProposal`] from a free-text request.
//!
//! Extraction is pattern based and conservative: anything the request does
//! not state is filled from per-type defaults, and the human reviews the whole
//! plan before anything is created.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Datelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tollgate_types::{ActivityProposal, ActivityType, ScheduleItem};
use tollgate_util::char_length;

static QUOTED_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"活动名称[为是]?\s*[:：]?\s*["“「『'《]([^"”」』'》]+)["”」』'》]"#).unwrap());
static NAMED_ACTIVITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:创建|策划|安排|举办|组织)(?:一个|一次|一场|一下)?(.{2,20}?)(活动|方案|计划)").unwrap());
static NAMED_EVENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:创建|策划|安排|举办|组织)(?:一个|一次|一场|一下)?([^，。,;；！!？?\s]{2,20})").unwrap());
static FULL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\s*[年/.-]\s*(\d{1,2})\s*[月/.-]\s*(\d{1,2})").unwrap());
static MONTH_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\s*月\s*(\d{1,2})\s*[日号]").unwrap());
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(上午|下午|晚上)?\s*(\d{1,2})\s*(?:[:：]\s*(\d{2})|点\s*(半)?)").unwrap());
static LABELED_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:活动地点|地点)(?:为|是)?\s*[:：]?\s*([^，。,;；\n]+)").unwrap());
static VENUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"在\s*([^，。,;；\n]{2,20}?)\s*(?:举行|举办|开展|进行)").unwrap());
static LABELED_AUDIENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:目标人群|参与对象|面向|对象)(?:为|是)?\s*[:：]?\s*([^，。,;；\n]+)").unwrap());
static AGE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\s*[-~至到]\s*\d+\s*岁[^，。,;；\n]*)").unwrap());
static NUMBERING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\d+[.、]").unwrap());

const DEFAULT_START: (u32, u32) = (9, 0);
const DEFAULT_DURATION_HOURS: i64 = 3;
const DEFAULT_LEAD_DAYS: u64 = 7;

/// What the request states explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetails {
    pub activity_type: ActivityType,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub target_audience: Option<String>,
}

/// Extracts details from `user_input`. `today` anchors dates given without a year.
pub fn extract_details(user_input: &str, today: NaiveDate) -> ActivityDetails {
    ActivityDetails {
        activity_type: detect_activity_type(user_input),
        title: extract_title(user_input),
        date: extract_date(user_input, today),
        start_time: extract_start_time(user_input),
        location: first_capture(user_input, &[&LABELED_LOCATION, &VENUE]),
        target_audience: first_capture(user_input, &[&LABELED_AUDIENCE, &AGE_RANGE]),
    }
}

/// Builds a complete plan: stated details first, per-type defaults for the
/// rest, and a date one week after `today` when none is given.
pub fn draft_proposal(user_input: &str, today: NaiveDate) -> ActivityProposal {
    let details = extract_details(user_input, today);
    let defaults = TypeDefaults::for_type(details.activity_type);
    let label = details.activity_type.label();

    let date = details
        .date
        .or_else(|| today.checked_add_days(Days::new(DEFAULT_LEAD_DAYS)))
        .unwrap_or(today);
    let start_clock = details
        .start_time
        .or_else(|| NaiveTime::from_hms_opt(DEFAULT_START.0, DEFAULT_START.1, 0))
        .unwrap_or(NaiveTime::MIN);
    let start_time = NaiveDateTime::new(date, start_clock);
    let end_time = start_time + Duration::hours(DEFAULT_DURATION_HOURS);

    ActivityProposal {
        title: details.title.unwrap_or_else(|| default_title(details.activity_type)),
        activity_type: details.activity_type,
        description: format!("这是一次精心策划的{}，旨在促进孩子们的身心发展，加强家园共育。", label),
        start_time,
        end_time,
        location: details.location.unwrap_or_else(|| defaults.location.to_string()),
        capacity: defaults.capacity,
        fee: 0.0,
        requirements: "适龄幼儿及家长".to_string(),
        target_audience: details.target_audience.unwrap_or_else(|| "全园幼儿".to_string()),
        materials: defaults.materials.iter().map(|item| item.to_string()).collect(),
        schedule: defaults
            .schedule
            .iter()
            .map(|(time, content)| ScheduleItem {
                time: time.to_string(),
                content: content.to_string(),
            })
            .collect(),
        notes: defaults.notes.iter().map(|note| note.to_string()).collect(),
    }
}

/// First matching keyword family wins, in a fixed order.
pub fn detect_activity_type(text: &str) -> ActivityType {
    const FAMILIES: &[(ActivityType, &[&str])] = &[
        (ActivityType::Sports, &["运动会", "体育"]),
        (ActivityType::ParentChild, &["亲子", "家长"]),
        (ActivityType::Festival, &["节日", "庆典"]),
        (ActivityType::Arts, &["艺术", "绘画", "音乐"]),
        (ActivityType::Science, &["科学", "实验"]),
        (ActivityType::Outdoor, &["户外", "郊游", "春游", "秋游"]),
    ];
    FAMILIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(activity_type, _)| *activity_type)
        .unwrap_or(ActivityType::General)
}

fn default_title(activity_type: ActivityType) -> String {
    let label = activity_type.label();
    if label.ends_with("活动") {
        label.to_string()
    } else {
        format!("{}活动", label)
    }
}

fn extract_title(text: &str) -> Option<String> {
    if let Some(title) = QUOTED_TITLE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|title| title.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
    {
        return Some(title);
    }
    if let Some(captures) = NAMED_ACTIVITY.captures(text)
        && let Some(name) = captures.get(1).and_then(|name| clean_title(name.as_str()))
    {
        let suffix = captures.get(2).map(|suffix| suffix.as_str()).unwrap_or_default();
        return Some(if suffix == "活动" { format!("{}活动", name) } else { name });
    }
    NAMED_EVENT
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|name| clean_title(name.as_str()))
}

/// Drops quantifiers and trailing modifiers; rejects generic words.
fn clean_title(raw: &str) -> Option<String> {
    let mut title = raw.trim();
    for prefix in ["一个", "一次", "一场"] {
        title = title.strip_prefix(prefix).unwrap_or(title);
    }
    let title = title.split('的').next().unwrap_or(title).trim();
    if char_length(title) < 2 || matches!(title, "活动" | "方案" | "计划") {
        return None;
    }
    Some(title.to_string())
}

fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(captures) = FULL_DATE.captures(text) {
        let year = captures.get(1)?.as_str().parse().ok()?;
        let month = captures.get(2)?.as_str().parse().ok()?;
        let day = captures.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let captures = MONTH_DAY.captures(text)?;
    let month = captures.get(1)?.as_str().parse().ok()?;
    let day = captures.get(2)?.as_str().parse().ok()?;
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(this_year)
    }
}

fn extract_start_time(text: &str) -> Option<NaiveTime> {
    let captures = CLOCK.captures(text)?;
    let mut hour: u32 = captures.get(2)?.as_str().parse().ok()?;
    let minute: u32 = match (captures.get(3), captures.get(4)) {
        (Some(minute), _) => minute.as_str().parse().ok()?,
        (None, Some(_)) => 30,
        (None, None) => 0,
    };
    if matches!(captures.get(1).map(|period| period.as_str()), Some("下午" | "晚上")) && hour < 12 {
        hour += 12;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn first_capture(text: &str, patterns: &[&Regex]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let captured = pattern.captures(text)?.get(1)?.as_str();
        let captured = match NUMBERING.find(captured) {
            Some(numbering) => &captured[..numbering.start()],
            None => captured,
        };
        let captured = captured.trim();
        (!captured.is_empty()).then(|| captured.to_string())
    })
}

struct TypeDefaults {
    location: &'static str,
    capacity: u32,
    materials: &'static [&'static str],
    schedule: &'static [(&'static str, &'static str)],
    notes: &'static [&'static str],
}

impl TypeDefaults {
    fn for_type(activity_type: ActivityType) -> Self {
        match activity_type {
            ActivityType::Sports => TypeDefaults {
                location: "幼儿园操场",
                capacity: 100,
                materials: &["运动器材", "奖品", "医疗箱", "饮用水"],
                schedule: &[("09:00-09:30", "开幕式"), ("09:30-10:30", "趣味比赛"), ("10:30-11:00", "颁奖典礼")],
                notes: &["请穿着运动服装", "注意防暑保暖", "准备足够饮用水"],
            },
            ActivityType::Outdoor => TypeDefaults {
                location: "市区公园",
                capacity: 50,
                materials: &["野餐垫", "食品饮料", "急救包", "垃圾袋"],
                schedule: &[("08:30-09:00", "集合出发"), ("09:00-11:00", "自由活动"), ("11:00-12:00", "野餐休息")],
                notes: &["请穿舒适的运动鞋", "注意安全，不要离开队伍", "自备防晒用品"],
            },
            ActivityType::Festival => TypeDefaults {
                location: "幼儿园大厅",
                capacity: 120,
                materials: &["舞台布置", "节目道具", "音响设备", "纪念品"],
                schedule: &[("09:00-09:20", "开场致辞"), ("09:20-10:40", "节目表演"), ("10:40-11:00", "合影留念")],
                notes: &["请提前十分钟入场", "演出期间请保持安静"],
            },
            ActivityType::Arts => TypeDefaults {
                location: "幼儿园美术教室",
                capacity: 40,
                materials: &["画纸", "颜料", "画笔", "围裙"],
                schedule: &[("09:00-09:15", "作品欣赏"), ("09:15-10:30", "创作时间"), ("10:30-11:00", "作品展示")],
                notes: &["请为孩子准备可弄脏的衣物"],
            },
            ActivityType::Science => TypeDefaults {
                location: "幼儿园科学活动室",
                capacity: 30,
                materials: &["实验器材", "护目镜", "记录卡"],
                schedule: &[("09:00-09:20", "现象观察"), ("09:20-10:30", "动手实验"), ("10:30-11:00", "分享发现")],
                notes: &["实验全程由老师指导", "请勿将实验材料带出教室"],
            },
            ActivityType::ParentChild | ActivityType::General => TypeDefaults {
                location: "幼儿园多功能厅",
                capacity: 60,
                materials: &["手工材料", "游戏道具", "小礼品"],
                schedule: &[("09:00-09:15", "签到入场"), ("09:15-10:00", "亲子游戏"), ("10:00-11:00", "手工制作")],
                notes: &["每位小朋友需一位家长陪同", "请提前5分钟到场"],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn sports_request_gets_sports_defaults_one_week_out() {
        let proposal = draft_proposal("帮我策划一个亲子运动会", today());

        assert_eq!(proposal.activity_type, ActivityType::Sports);
        assert_eq!(proposal.title, "亲子运动会");
        assert_eq!(proposal.location, "幼儿园操场");
        assert_eq!(proposal.capacity, 100);
        assert_eq!(proposal.start_time.to_string(), "2025-03-17 09:00:00");
        assert_eq!(proposal.end_time.to_string(), "2025-03-17 12:00:00");
        assert_eq!(proposal.schedule.len(), 3);
    }

    #[test]
    fn structured_request_overrides_defaults() {
        let input = "创建活动，活动名称为“春季亲子游园会”，活动时间：2025年4月18日 下午2点半，地点：幼儿园后花园，目标人群：3-6岁幼儿及家长";
        let proposal = draft_proposal(input, today());

        assert_eq!(proposal.title, "春季亲子游园会");
        assert_eq!(proposal.activity_type, ActivityType::ParentChild);
        assert_eq!(proposal.start_time.to_string(), "2025-04-18 14:30:00");
        assert_eq!(proposal.location, "幼儿园后花园");
        assert_eq!(proposal.target_audience, "3-6岁幼儿及家长");
    }

    #[test]
    fn numbered_fields_stop_at_the_next_item() {
        let details = extract_details("1. 活动地点：操场 2. 目标人群：大班幼儿", today());
        assert_eq!(details.location.as_deref(), Some("操场"));
        assert_eq!(details.target_audience.as_deref(), Some("大班幼儿"));
    }

    #[test]
    fn month_day_in_the_past_rolls_to_next_year() {
        assert_eq!(
            extract_date("1月5日举办", today()),
            NaiveDate::from_ymd_opt(2026, 1, 5)
        );
        assert_eq!(
            extract_date("5月1号举办", today()),
            NaiveDate::from_ymd_opt(2025, 5, 1)
        );
    }

    #[test]
    fn named_activity_keeps_the_activity_suffix() {
        assert_eq!(extract_title("组织一次春季踏青活动"), Some("春季踏青活动".to_string()));
        assert_eq!(extract_title("策划一个中秋晚会的方案"), Some("中秋晚会".to_string()));
    }

    #[test]
    fn generic_request_falls_back_to_type_title() {
        let proposal = draft_proposal("帮我策划一个活动", today());
        assert_eq!(proposal.activity_type, ActivityType::General);
        assert_eq!(proposal.title, "综合活动");
        assert_eq!(proposal.target_audience, "全园幼儿");
    }

    #[test]
    fn venue_phrase_is_a_location() {
        let details = extract_details("下周在市体育馆举行运动会", today());
        assert_eq!(details.location.as_deref(), Some("市体育馆"));
        assert_eq!(details.activity_type, ActivityType::Sports);
    }
}
