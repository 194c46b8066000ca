//! Weighted complexity scoring over Chinese and English request text.
//!
//! The assessment is advisory: it recommends a strategy but never blocks a
//! call. Every signal only adds weight, so adding evidence to a request can
//! never lower its score.

use tollgate_types::{ComplexityAssessment, ComplexityLevel, ExecutionStrategy, MatchedSignal, SignalKind};
use tollgate_util::char_length;

const MULTIPLE_ACTIONS_WEIGHT: f64 = 2.0;
const SEQUENCING_WEIGHT: f64 = 1.5;
const PLANNING_WEIGHT: f64 = 2.5;
const LONG_REQUEST_WEIGHT: f64 = 1.0;
const MULTIPLE_OBJECTS_WEIGHT: f64 = 1.5;
const LONG_REQUEST_CHARS: usize = 50;

const ACTION_VERBS: &[&str] = &[
    "创建", "新增", "添加", "查询", "查看", "修改", "更新", "删除", "发送", "通知", "导出", "统计", "生成", "安排",
    "报名", "登记", "create", "add", "query", "list", "update", "delete", "remove", "send", "notify", "export",
    "generate", "schedule",
];

const SEQUENCING_WORDS: &[&str] = &[
    "首先", "然后", "接着", "随后", "之后", "最后", "第一步", "第二步", "first", "then", "next", "afterwards",
    "finally",
];

const PLANNING_WORDS: &[&str] = &[
    "策划", "方案", "完整流程", "全流程", "规划", "筹备", "组织", "plan", "campaign", "organize", "workflow",
    "strategy",
];

const BUSINESS_OBJECTS: &[&str] = &[
    "学生", "班级", "教师", "老师", "家长", "活动", "海报", "营销", "考勤", "通知", "二维码", "student", "class",
    "teacher", "parent", "activity", "poster", "marketing", "attendance", "notification",
];

const ACTIVITY_WORDS: &[&str] = &["活动", "运动会", "亲子", "春游", "秋游", "庆典", "activity", "event"];
const ACTIVITY_CREATION_VERBS: &[&str] = &["创建", "策划", "组织", "举办", "安排", "create", "plan", "organize", "host"];

/// Scores `user_input` (plus optional conversation `context`).
///
/// Thresholds: below 2 simple, below 4 moderate, below 6 complex, otherwise
/// very complex. The workflow strategy is only recommended for very complex
/// requests that ask to create or plan an activity.
pub fn analyze_complexity(user_input: &str, context: Option<&str>) -> ComplexityAssessment {
    let text = user_input.to_lowercase();
    let mut signals = Vec::new();

    let verbs = matched_terms(&text, ACTION_VERBS);
    if verbs.len() >= 2 {
        signals.push(signal(SignalKind::MultipleActions, MULTIPLE_ACTIONS_WEIGHT, verbs.clone()));
    }
    let sequencing = matched_terms(&text, SEQUENCING_WORDS);
    if !sequencing.is_empty() {
        signals.push(signal(SignalKind::Sequencing, SEQUENCING_WEIGHT, sequencing.clone()));
    }
    let planning = matched_terms(&text, PLANNING_WORDS);
    if !planning.is_empty() {
        signals.push(signal(SignalKind::PlanningVocabulary, PLANNING_WEIGHT, planning));
    }
    let length = char_length(user_input.trim());
    if length > LONG_REQUEST_CHARS {
        signals.push(signal(SignalKind::LongRequest, LONG_REQUEST_WEIGHT, vec![format!("{} characters", length)]));
    }
    let combined = match context {
        Some(context) => format!("{} {}", text, context.to_lowercase()),
        None => text.clone(),
    };
    let objects = matched_terms(&combined, BUSINESS_OBJECTS);
    if objects.len() >= 2 {
        signals.push(signal(SignalKind::MultipleObjects, MULTIPLE_OBJECTS_WEIGHT, objects));
    }

    let score: f64 = signals.iter().map(|signal| signal.weight).sum();
    let level = level_for(score);
    let has_sequencing = !sequencing.is_empty();
    let needs_todo_list = level >= ComplexityLevel::Complex || (level == ComplexityLevel::Moderate && has_sequencing);
    let activity_intent =
        !matched_terms(&text, ACTIVITY_WORDS).is_empty() && !matched_terms(&text, ACTIVITY_CREATION_VERBS).is_empty();
    let strategy = match level {
        ComplexityLevel::VeryComplex if activity_intent => ExecutionStrategy::Workflow,
        ComplexityLevel::Complex | ComplexityLevel::VeryComplex => ExecutionStrategy::Decompose,
        ComplexityLevel::Moderate if has_sequencing => ExecutionStrategy::Decompose,
        _ => ExecutionStrategy::Direct,
    };

    ComplexityAssessment {
        level,
        score,
        estimated_steps: estimated_steps(level, verbs.len(), sequencing.len()),
        needs_todo_list,
        recommendation: recommendation(strategy).to_string(),
        strategy,
        signals,
    }
}

fn level_for(score: f64) -> ComplexityLevel {
    if score < 2.0 {
        ComplexityLevel::Simple
    } else if score < 4.0 {
        ComplexityLevel::Moderate
    } else if score < 6.0 {
        ComplexityLevel::Complex
    } else {
        ComplexityLevel::VeryComplex
    }
}

fn estimated_steps(level: ComplexityLevel, verb_count: usize, sequencing_count: usize) -> usize {
    let floor = match level {
        ComplexityLevel::Simple => 1,
        ComplexityLevel::Moderate => 2,
        ComplexityLevel::Complex => 3,
        ComplexityLevel::VeryComplex => 5,
    };
    floor.max(verb_count.max(sequencing_count + 1))
}

fn recommendation(strategy: ExecutionStrategy) -> &'static str {
    match strategy {
        ExecutionStrategy::Direct => {
            "Run the discovery chain directly: resolve_categories, list_endpoints, get_operation_detail, execute_operation."
        }
        ExecutionStrategy::Decompose => {
            "Create a todo list with create_todo_list, then work through the tasks in order and report each with update_todo_task."
        }
        ExecutionStrategy::Workflow => {
            "Call execute_activity_workflow with the user's request; it proposes a plan and waits for confirmation before creating anything."
        }
    }
}

fn signal(kind: SignalKind, weight: f64, evidence: Vec<String>) -> MatchedSignal {
    MatchedSignal { kind, weight, evidence }
}

/// Distinct vocabulary terms found in `text`, in vocabulary order.
///
/// ASCII terms match whole words; CJK terms match as substrings.
fn matched_terms(text: &str, vocabulary: &[&str]) -> Vec<String> {
    vocabulary
        .iter()
        .filter(|term| contains_term(text, term))
        .map(|term| term.to_string())
        .collect()
}

fn contains_term(text: &str, term: &str) -> bool {
    if term.is_ascii() {
        text.split(|character: char| !character.is_ascii_alphanumeric())
            .any(|word| word == term)
    } else {
        text.contains(term)
    }
}
