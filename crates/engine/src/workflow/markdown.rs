//! Markdown renderings shown to the human at the confirmation gate and after completion.

use std::fmt::Write as _;

use tollgate_types::{ActivityProposal, GeneratedAsset, WorkflowArtifacts};

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The plan presented while the workflow waits for approval.
pub fn render_proposal_markdown(proposal: &ActivityProposal) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# 活动方案：{}\n", proposal.title);
    let _ = writeln!(out, "## 基本信息\n");
    let _ = writeln!(out, "| 项目 | 内容 |");
    let _ = writeln!(out, "| --- | --- |");
    let _ = writeln!(out, "| 活动类型 | {} |", proposal.activity_type.label());
    let _ = writeln!(out, "| 开始时间 | {} |", proposal.start_time.format(DATE_TIME_FORMAT));
    let _ = writeln!(out, "| 结束时间 | {} |", proposal.end_time.format(DATE_TIME_FORMAT));
    let _ = writeln!(out, "| 活动地点 | {} |", proposal.location);
    let _ = writeln!(out, "| 人数上限 | {} |", proposal.capacity);
    let _ = writeln!(out, "| 活动费用 | {} |", format_fee(proposal.fee));
    let _ = writeln!(out, "| 目标人群 | {} |\n", proposal.target_audience);

    let _ = writeln!(out, "## 活动描述\n\n{}\n", proposal.description);
    if !proposal.requirements.is_empty() {
        let _ = writeln!(out, "## 参与要求\n\n{}\n", proposal.requirements);
    }
    if !proposal.materials.is_empty() {
        let _ = writeln!(out, "## 所需材料\n");
        for material in &proposal.materials {
            let _ = writeln!(out, "- {}", material);
        }
        out.push('\n');
    }
    if !proposal.schedule.is_empty() {
        let _ = writeln!(out, "## 活动流程\n");
        let _ = writeln!(out, "| 时间 | 内容 |");
        let _ = writeln!(out, "| --- | --- |");
        for item in &proposal.schedule {
            let _ = writeln!(out, "| {} | {} |", item.time, item.content);
        }
        out.push('\n');
    }
    if !proposal.notes.is_empty() {
        let _ = writeln!(out, "## 注意事项\n");
        for (position, note) in proposal.notes.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", position + 1, note);
        }
        out.push('\n');
    }
    let _ = write!(out, "请确认以上方案。确认后将创建活动并生成海报、营销配置和分享二维码。");
    out
}

/// Summary of everything the workflow produced.
pub fn render_completion_markdown(proposal: &ActivityProposal, artifacts: &WorkflowArtifacts) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# 活动创建完成：{}\n", proposal.title);
    let _ = writeln!(out, "## 活动信息\n");
    if let Some(id) = &artifacts.activity_id {
        let _ = writeln!(out, "- 活动ID：{}", id);
    }
    let _ = writeln!(
        out,
        "- 时间：{} 至 {}",
        proposal.start_time.format(DATE_TIME_FORMAT),
        proposal.end_time.format(DATE_TIME_FORMAT)
    );
    let _ = writeln!(out, "- 地点：{}\n", proposal.location);

    let _ = writeln!(out, "## 生成的资源\n");
    if let Some(poster) = &artifacts.poster {
        let _ = writeln!(out, "- 活动海报：{}", asset_line(poster));
    }
    match &artifacts.marketing_id {
        Some(id) => {
            let _ = writeln!(out, "- 营销活动：{}", id);
        }
        None => {
            let _ = writeln!(out, "- 营销活动：未配置（可稍后手动设置）");
        }
    }
    for poster in &artifacts.mobile_posters {
        let platform = poster.platform.as_deref().unwrap_or("mobile");
        let _ = writeln!(out, "- {} 海报：{}", platform, asset_line(poster));
    }
    out.push('\n');

    if artifacts.share_url.is_some() || artifacts.registration_url.is_some() {
        let _ = writeln!(out, "## 分享信息\n");
        if let Some(url) = &artifacts.share_url {
            let _ = writeln!(out, "- 分享链接：{}", url);
        }
        if let Some(url) = &artifacts.registration_url {
            let _ = writeln!(out, "- 报名链接：{}", url);
        }
        out.push('\n');
    }
    if let Some(qr_code) = &artifacts.qr_code {
        let _ = writeln!(out, "![报名二维码]({})", qr_code.url);
        if qr_code.degraded {
            let _ = writeln!(out, "\n（二维码为占位图，请稍后重新生成）");
        }
    }
    out.trim_end().to_string()
}

fn asset_line(asset: &GeneratedAsset) -> String {
    if asset.degraded {
        format!("{}（占位图，生成失败）", asset.url)
    } else {
        asset.url.clone()
    }
}

fn format_fee(fee: f64) -> String {
    if fee <= 0.0 { "免费".to_string() } else { format!("{:.2} 元", fee) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::proposal::draft_proposal;
    use chrono::NaiveDate;

    fn proposal() -> ActivityProposal {
        draft_proposal("帮我策划一个亲子运动会", NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    #[test]
    fn proposal_lists_every_section() {
        let markdown = render_proposal_markdown(&proposal());
        for heading in ["# 活动方案：亲子运动会", "## 基本信息", "## 活动描述", "## 所需材料", "## 活动流程", "## 注意事项"] {
            assert!(markdown.contains(heading), "missing {heading}");
        }
        assert!(markdown.contains("| 开始时间 | 2025-03-17 09:00 |"));
        assert!(markdown.contains("| 活动费用 | 免费 |"));
    }

    #[test]
    fn completion_marks_placeholders() {
        let artifacts = WorkflowArtifacts {
            activity_id: Some("42".into()),
            poster: Some(GeneratedAsset {
                platform: None,
                url: "/uploads/posters/poster_42.png".into(),
                degraded: true,
            }),
            share_url: Some("http://localhost:5173/activity/share/42".into()),
            ..WorkflowArtifacts::default()
        };
        let markdown = render_completion_markdown(&proposal(), &artifacts);
        assert!(markdown.contains("- 活动ID：42"));
        assert!(markdown.contains("poster_42.png（占位图，生成失败）"));
        assert!(markdown.contains("未配置"));
        assert!(markdown.contains("分享链接：http://localhost:5173/activity/share/42"));
    }
}
