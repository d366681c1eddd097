use std::fmt::Write as _;
use std::str::FromStr;

use crate::diff::ChangeSet;
use crate::llm::prompts::{
    PromptVariant, TAG_COMMIT_MESSAGE, TAG_DIFF, TAG_HUMAN_CONTEXT, TAG_ISSUE, TAG_ITEMS,
    TAG_OMISSIONS, TAG_RANKING,
};
use crate::message::ParseStrategy;
use crate::tracker::IssueContext;

/// How much scaffolding the prompt asks the model to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Numbered reasoning steps with tagged blocks.
    #[default]
    Structured,
    /// A short instruction that asks for the bare message.
    Direct,
}

impl PromptStyle {
    pub fn parse_strategy(&self) -> ParseStrategy {
        match self {
            PromptStyle::Structured => ParseStrategy::Tagged,
            PromptStyle::Direct => ParseStrategy::Plain,
        }
    }
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" => Ok(PromptStyle::Structured),
            "direct" => Ok(PromptStyle::Direct),
            other => Err(format!("unknown prompt style '{other}'")),
        }
    }
}

/// Render the prompt for one variant in the requested style.
pub fn render(
    style: PromptStyle,
    change_set: &ChangeSet,
    human_context: Option<&str>,
    issue: Option<&IssueContext>,
    variant: PromptVariant,
) -> String {
    match style {
        PromptStyle::Structured => build_prompt(change_set, human_context, issue, variant),
        PromptStyle::Direct => build_direct_prompt(change_set, human_context, issue, variant),
    }
}

/// Render the structured, step-numbered prompt.
///
/// The output is a pure function of the inputs. Optional steps (human
/// context, issue) are only emitted when their input is non-empty, and the
/// remaining steps are numbered consecutively from 1.
pub fn build_prompt(
    change_set: &ChangeSet,
    human_context: Option<&str>,
    issue: Option<&IssueContext>,
    variant: PromptVariant,
) -> String {
    let p = variant.phrases();
    let human_context = non_empty(human_context);

    let mut out = String::new();
    out.push_str(p.goal);
    out.push_str("\n\n");
    push_inputs(&mut out, change_set, human_context, issue, variant);

    let mut steps: Vec<(&str, &str)> = Vec::new();
    if human_context.is_some() {
        steps.push((p.human_context_step, TAG_HUMAN_CONTEXT));
    }
    if issue.is_some() {
        steps.push((p.issue_step, TAG_ISSUE));
    }
    steps.push((p.diff_step, TAG_DIFF));
    steps.push((p.items_step, TAG_ITEMS));
    steps.push((p.omissions_step, TAG_OMISSIONS));
    steps.push((p.ranking_step, TAG_RANKING));
    steps.push((p.message_step, TAG_COMMIT_MESSAGE));

    for (idx, (text, tag)) in steps.iter().enumerate() {
        let _ = writeln!(
            out,
            "{label} {n}: {body}\n",
            label = p.step_label,
            n = idx + 1,
            body = text.replace("{tag}", tag)
        );
    }

    push_summary(&mut out, change_set, variant);
    out
}

/// Render the short prompt that asks for the message only.
pub fn build_direct_prompt(
    change_set: &ChangeSet,
    human_context: Option<&str>,
    issue: Option<&IssueContext>,
    variant: PromptVariant,
) -> String {
    let mut out = String::new();
    out.push_str(variant.phrases().direct_instruction);
    out.push_str("\n\n");
    push_inputs(&mut out, change_set, non_empty(human_context), issue, variant);
    push_summary(&mut out, change_set, variant);
    out
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn push_inputs(
    out: &mut String,
    change_set: &ChangeSet,
    human_context: Option<&str>,
    issue: Option<&IssueContext>,
    variant: PromptVariant,
) {
    if let Some(ctx) = human_context {
        let _ = writeln!(out, "<human-context>\n{ctx}\n</human-context>\n");
    }

    if let Some(issue) = issue {
        out.push_str(&render_issue(issue, variant));
        out.push('\n');
    }

    let diff = change_set.raw_diff.trim_end();
    if diff.is_empty() {
        out.push_str("<diff>\n</diff>\n\n");
    } else {
        let _ = writeln!(out, "<diff>\n{diff}\n</diff>\n");
    }
}

fn render_issue(issue: &IssueContext, variant: PromptVariant) -> String {
    let p = variant.phrases();
    let mut out = String::new();

    let _ = writeln!(out, "<issue id=\"#{}\">", issue.id);
    let _ = writeln!(out, "{}: {}", p.issue_title, issue.title.trim());
    if !issue.labels.is_empty() {
        let labels: Vec<&str> = issue.labels.iter().map(String::as_str).collect();
        let _ = writeln!(out, "{}: {}", p.issue_labels, labels.join(", "));
    }
    if !issue.body.trim().is_empty() {
        let _ = writeln!(out, "{}:\n{}", p.issue_description, issue.body.trim());
    }
    if !issue.comments.is_empty() {
        let _ = writeln!(out, "{}:", p.issue_comments);
        for c in &issue.comments {
            let _ = writeln!(
                out,
                "- {} (#{}): {}",
                c.author,
                c.id,
                c.body.trim().replace('\n', "\n  ")
            );
        }
    }
    out.push_str("</issue>\n");
    out
}

fn push_summary(out: &mut String, change_set: &ChangeSet, variant: PromptVariant) {
    let p = variant.phrases();

    out.push_str(p.files_heading);
    out.push('\n');
    if change_set.files.is_empty() {
        let _ = writeln!(out, "{}", p.no_files);
    }
    for file in &change_set.files {
        let _ = writeln!(out, "- {file}");
    }

    let stats = p
        .stats_line
        .replace("{additions}", &change_set.additions.to_string())
        .replace("{deletions}", &change_set.deletions.to_string());
    out.push_str(&stats);
    out.push('\n');
}
