//! One run of gitscribe: from repository status to a commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use colored::Colorize;

use crate::cli_args::Cli;
use crate::diff::ChangeSet;
use crate::error::{AppError, AppResult, GenerationError};
use crate::git::{Vcs, issue_number_from_branch};
use crate::llm::prompt_builder::{PromptStyle, render};
use crate::llm::prompts::PromptVariant;
use crate::llm::{LlmClient, invoke_all};
use crate::message::{GeneratedMessage, parse_with};
use crate::quality;
use crate::tracker::{IssueContext, IssueTracker};
use crate::ui::{Prompter, generation_progress};

/// How a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Committed,
    Amended,
    Cancelled,
    NothingToCommit,
    DryRun,
}

/// Where the author's description of the change comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextInput {
    Ask,
    Given(String),
    Skip,
}

/// Which issue, if any, to quote in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLookup {
    FromBranch,
    Number(u64),
    Skip,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub context: ContextInput,
    pub issue: IssueLookup,
    pub amend: bool,
    pub yes: bool,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        let context = match (&cli.context, cli.no_context) {
            (_, true) => ContextInput::Skip,
            (Some(text), false) => ContextInput::Given(text.clone()),
            (None, false) if cli.yes => ContextInput::Skip,
            (None, false) => ContextInput::Ask,
        };
        let issue = match (cli.issue, cli.no_issue) {
            (_, true) => IssueLookup::Skip,
            (Some(n), false) => IssueLookup::Number(n),
            (None, false) => IssueLookup::FromBranch,
        };

        RunOptions {
            context,
            issue,
            amend: cli.amend,
            yes: cli.yes,
            dry_run: cli.dry_run,
        }
    }
}

/// What the user picked to do with the chosen message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitAction {
    Commit,
    Amend,
    Cancel,
}

/// Everything a run needs, built once in `main`.
pub struct Session<'a> {
    pub vcs: &'a dyn Vcs,
    pub prompter: &'a dyn Prompter,
    pub llm: Arc<dyn LlmClient>,
    pub tracker: Option<&'a dyn IssueTracker>,
    /// Primary language first.
    pub languages: Vec<PromptVariant>,
    pub style: PromptStyle,
    pub options: RunOptions,
}

impl Session<'_> {
    pub async fn run(&self) -> AppResult<RunOutcome> {
        if !self.vcs.is_repository() {
            return Err(AppError::Vcs("not inside a git repository".into()));
        }

        let status = self.vcs.status()?;
        log::debug!(
            "Status: {} staged, {} unstaged, {} untracked",
            status.staged.len(),
            status.unstaged.len(),
            status.untracked.len()
        );

        if !status.has_staged() {
            if !status.has_unstaged_work() {
                println!("Nothing to commit.");
                return Ok(RunOutcome::NothingToCommit);
            }

            let pending = status.pending_paths();
            println!("No staged changes. Unstaged or untracked files:");
            for path in &pending {
                println!("  {path}");
            }
            let stage = self.options.yes
                || self.prompter.confirm("Stage all of these files?", true)?;
            if !stage {
                return Ok(RunOutcome::Cancelled);
            }
            self.vcs.add(&pending)?;
        }

        let change_set = self.vcs.staged_change_set()?;
        if change_set.is_empty() {
            println!("Nothing to commit.");
            return Ok(RunOutcome::NothingToCommit);
        }
        log::info!(
            "Collected {} file(s), +{} -{}",
            change_set.files.len(),
            change_set.additions,
            change_set.deletions
        );

        let human_context = self.gather_context()?;
        let issue = self.gather_issue().await;

        let prompts = self.build_prompts(&change_set, human_context.as_deref(), issue.as_ref());

        if self.options.dry_run {
            for (variant, prompt) in &prompts {
                println!("{}", format!("===== {variant} ({}) prompt =====", variant.code()).bold());
                println!("{prompt}");
            }
            return Ok(RunOutcome::DryRun);
        }

        let messages = self.generate(prompts).await?;
        self.show_messages(&messages);

        let Some(message) = self.choose_message(&messages)? else {
            return Ok(RunOutcome::Cancelled);
        };
        if message.is_empty() {
            return Err(GenerationError::UnexpectedResponse(
                "the chosen commit message is empty".into(),
            )
            .into());
        }

        match self.choose_action()? {
            CommitAction::Commit => {
                self.vcs.commit(&message.to_string())?;
                println!("{}", "Committed.".green().bold());
                Ok(RunOutcome::Committed)
            }
            CommitAction::Amend => {
                let previous = self.vcs.last_message()?;
                println!("Previous commit message:\n{}", previous.dimmed());
                let replace = self.options.yes
                    || self
                        .prompter
                        .confirm("Replace it with the new message?", true)?;
                if !replace {
                    return Ok(RunOutcome::Cancelled);
                }
                self.vcs.amend(&message.to_string())?;
                println!("{}", "Amended previous commit.".green().bold());
                Ok(RunOutcome::Amended)
            }
            CommitAction::Cancel => Ok(RunOutcome::Cancelled),
        }
    }

    fn gather_context(&self) -> AppResult<Option<String>> {
        let text = match &self.options.context {
            ContextInput::Skip => return Ok(None),
            ContextInput::Given(text) => text.clone(),
            ContextInput::Ask => self
                .prompter
                .input("Optional: briefly describe the change (enter to skip): ")?,
        };
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    /// Issue lookups never fail the run; problems are logged and skipped.
    async fn gather_issue(&self) -> Option<IssueContext> {
        let number = match self.options.issue {
            IssueLookup::Skip => return None,
            IssueLookup::Number(n) => n,
            IssueLookup::FromBranch => {
                let branch = match self.vcs.current_branch() {
                    Ok(b) => b,
                    Err(e) => {
                        log::warn!("Could not read the current branch: {e}");
                        return None;
                    }
                };
                match issue_number_from_branch(&branch) {
                    Some(n) => n,
                    None => {
                        log::debug!("No issue number in branch {branch:?}");
                        return None;
                    }
                }
            }
        };

        let Some(tracker) = self.tracker else {
            log::info!("Issue #{number} not fetched: no issue tracker credential");
            return None;
        };
        let Some(repo) = self.vcs.remote_repo_id() else {
            log::warn!("Issue #{number} not fetched: no remote repository configured");
            return None;
        };

        match tracker.fetch_issue(&repo, number).await {
            Ok(issue) => {
                log::info!("Using issue #{} ({})", issue.id, issue.title);
                Some(issue)
            }
            Err(e) => {
                log::warn!("Continuing without issue #{number}: {e}");
                None
            }
        }
    }

    fn build_prompts(
        &self,
        change_set: &ChangeSet,
        human_context: Option<&str>,
        issue: Option<&IssueContext>,
    ) -> BTreeMap<PromptVariant, String> {
        self.languages
            .iter()
            .map(|&variant| {
                let prompt = render(self.style, change_set, human_context, issue, variant);
                (variant, prompt)
            })
            .collect()
    }

    async fn generate(
        &self,
        prompts: BTreeMap<PromptVariant, String>,
    ) -> AppResult<Vec<(PromptVariant, GeneratedMessage)>> {
        let pb = generation_progress(prompts.len() as u64);
        let result = invoke_all(Arc::clone(&self.llm), prompts, Some(&pb)).await;
        pb.finish_and_clear();
        let mut completions = result?;

        let strategy = self.style.parse_strategy();
        Ok(self
            .languages
            .iter()
            .filter_map(|variant| {
                completions
                    .remove(variant)
                    .map(|text| (*variant, parse_with(strategy, &text)))
            })
            .collect())
    }

    fn show_messages(&self, messages: &[(PromptVariant, GeneratedMessage)]) {
        for (variant, message) in messages {
            let score = quality::score(message);
            let score_label = format!("score {score:.1}");
            let score_label = if score >= 0.7 {
                score_label.green()
            } else if score >= 0.5 {
                score_label.yellow()
            } else {
                score_label.red()
            };

            println!("\n{} ({score_label})", format!("── {variant} ──").cyan().bold());
            if message.is_empty() {
                println!("{}", "(empty)".dimmed());
            } else {
                println!("{message}");
            }
        }
        println!();
    }

    fn choose_message(
        &self,
        messages: &[(PromptVariant, GeneratedMessage)],
    ) -> AppResult<Option<GeneratedMessage>> {
        let Some((_, primary)) = messages.first() else {
            return Err(GenerationError::UnexpectedResponse("no completions returned".into()).into());
        };
        if self.options.yes {
            return Ok(Some(primary.clone()));
        }

        let mut items: Vec<String> = messages
            .iter()
            .map(|(variant, m)| format!("{variant}: {}", m.subject))
            .collect();
        if messages.len() > 1 {
            items.push("All languages combined".to_string());
        }

        match self.prompter.select("Which message do you want to use?", &items)? {
            Some(idx) if idx < messages.len() => Ok(Some(messages[idx].1.clone())),
            Some(_) => Ok(Some(combine(messages))),
            None => Ok(None),
        }
    }

    fn choose_action(&self) -> AppResult<CommitAction> {
        if self.options.yes {
            return Ok(if self.options.amend {
                CommitAction::Amend
            } else {
                CommitAction::Commit
            });
        }

        let mut actions = vec![
            (CommitAction::Commit, "Create a new commit"),
            (CommitAction::Amend, "Amend the previous commit"),
            (CommitAction::Cancel, "Cancel"),
        ];
        if self.options.amend {
            actions.swap(0, 1);
        }
        let items: Vec<String> = actions.iter().map(|(_, label)| label.to_string()).collect();

        Ok(self
            .prompter
            .select("What do you want to do?", &items)?
            .and_then(|idx| actions.get(idx))
            .map(|(action, _)| *action)
            .unwrap_or(CommitAction::Cancel))
    }
}

/// The primary message with every other language appended to its body.
fn combine(messages: &[(PromptVariant, GeneratedMessage)]) -> GeneratedMessage {
    let Some(((_, primary), rest)) = messages.split_first() else {
        return GeneratedMessage::default();
    };

    let mut parts = Vec::new();
    if !primary.body.is_empty() {
        parts.push(primary.body.clone());
    }
    parts.extend(
        rest.iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(_, m)| m.to_string()),
    );

    GeneratedMessage {
        subject: primary.subject.clone(),
        body: parts.join("\n\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueTrackerError;
    use crate::git::RepoStatus;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeVcs {
        status: RepoStatus,
        change_set: ChangeSet,
        branch: String,
        remote: Option<String>,
        added: RefCell<Vec<String>>,
        commits: RefCell<Vec<String>>,
        amends: RefCell<Vec<String>>,
    }

    impl Vcs for FakeVcs {
        fn is_repository(&self) -> bool {
            true
        }
        fn status(&self) -> AppResult<RepoStatus> {
            Ok(self.status.clone())
        }
        fn staged_change_set(&self) -> AppResult<ChangeSet> {
            Ok(self.change_set.clone())
        }
        fn add(&self, paths: &[String]) -> AppResult<()> {
            self.added.borrow_mut().extend(paths.iter().cloned());
            Ok(())
        }
        fn commit(&self, message: &str) -> AppResult<()> {
            self.commits.borrow_mut().push(message.to_string());
            Ok(())
        }
        fn amend(&self, message: &str) -> AppResult<()> {
            self.amends.borrow_mut().push(message.to_string());
            Ok(())
        }
        fn last_message(&self) -> AppResult<String> {
            Ok("Old message".into())
        }
        fn current_branch(&self) -> AppResult<String> {
            Ok(self.branch.clone())
        }
        fn remote_repo_id(&self) -> Option<String> {
            self.remote.clone()
        }
    }

    /// Answers questions from a script; running out of answers is a test bug.
    #[derive(Default)]
    struct ScriptedPrompter {
        inputs: RefCell<VecDeque<String>>,
        confirms: RefCell<VecDeque<bool>>,
        selects: RefCell<VecDeque<Option<usize>>>,
        asked: RefCell<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn with_selects(selects: &[Option<usize>]) -> Self {
            ScriptedPrompter {
                selects: RefCell::new(selects.iter().copied().collect()),
                ..Default::default()
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn input(&self, prompt: &str) -> AppResult<String> {
            self.asked.borrow_mut().push(prompt.to_string());
            Ok(self.inputs.borrow_mut().pop_front().unwrap_or_default())
        }
        fn confirm(&self, prompt: &str, _default: bool) -> AppResult<bool> {
            self.asked.borrow_mut().push(prompt.to_string());
            Ok(self.confirms.borrow_mut().pop_front().expect("unexpected confirm"))
        }
        fn select(&self, prompt: &str, items: &[String]) -> AppResult<Option<usize>> {
            self.asked.borrow_mut().push(format!("{prompt} {items:?}"));
            Ok(self.selects.borrow_mut().pop_front().expect("unexpected select"))
        }
    }

    /// Answers with a tagged message naming the prompt's language.
    #[derive(Default)]
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let subject = if prompt.contains("日本語") {
                "ページングを修正"
            } else {
                "Fix paging"
            };
            Ok(format!(
                "<diff-observations>...</diff-observations>\n<commit-message>\n{subject}\n\n- detail\n</commit-message>"
            ))
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Rejected {
                status: 401,
                body: "invalid x-api-key".into(),
            })
        }
    }

    struct StaticTracker;

    #[async_trait]
    impl IssueTracker for StaticTracker {
        async fn fetch_issue(
            &self,
            repo: &str,
            number: u64,
        ) -> Result<IssueContext, IssueTrackerError> {
            if number == 404 {
                return Err(IssueTrackerError::Status {
                    status: 404,
                    url: format!("{repo}/issues/{number}"),
                });
            }
            Ok(IssueContext {
                id: number,
                title: "Paging skips last page".into(),
                ..Default::default()
            })
        }
    }

    fn staged_vcs() -> FakeVcs {
        FakeVcs {
            status: RepoStatus {
                staged: vec!["src/a.rs".into(), "src/b.rs".into()],
                ..Default::default()
            },
            change_set: ChangeSet {
                files: vec!["src/a.rs".into(), "src/b.rs".into()],
                additions: 10,
                deletions: 3,
                raw_diff: "diff --git a/src/a.rs b/src/a.rs\n+fn paging() {}\n".into(),
            },
            branch: "main".into(),
            ..Default::default()
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            context: ContextInput::Skip,
            issue: IssueLookup::Skip,
            amend: false,
            yes: false,
            dry_run: false,
        }
    }

    fn session<'a>(
        vcs: &'a FakeVcs,
        prompter: &'a ScriptedPrompter,
        llm: Arc<dyn LlmClient>,
        options: RunOptions,
    ) -> Session<'a> {
        Session {
            vcs,
            prompter,
            llm,
            tracker: None,
            languages: vec![PromptVariant::English, PromptVariant::Japanese],
            style: PromptStyle::Structured,
            options,
        }
    }

    #[tokio::test]
    async fn declining_after_generation_cancels_without_committing() {
        let vcs = staged_vcs();
        // Pick the English message, then cancel at the action menu.
        let prompter = ScriptedPrompter::with_selects(&[Some(0), Some(2)]);
        let llm = Arc::new(RecordingLlm::default());

        let outcome = session(&vcs, &prompter, llm.clone(), options())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(vcs.commits.borrow().is_empty());
        assert!(vcs.amends.borrow().is_empty());

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        let english = prompts.iter().find(|p| p.contains("in English")).unwrap();
        let japanese = prompts.iter().find(|p| p.contains("日本語")).unwrap();
        for p in [english, japanese] {
            assert!(p.contains("src/a.rs"));
            assert!(p.contains("+fn paging() {}"));
            assert!(!p.contains("<human-context>"));
        }
        assert!(english.contains("10 lines added, 3 lines removed"));
    }

    #[tokio::test]
    async fn chosen_message_is_committed() {
        let vcs = staged_vcs();
        let prompter = ScriptedPrompter::with_selects(&[Some(1), Some(0)]);

        let outcome = session(&vcs, &prompter, Arc::new(RecordingLlm::default()), options())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Committed);
        assert_eq!(*vcs.commits.borrow(), vec!["ページングを修正\n\n- detail".to_string()]);
    }

    #[tokio::test]
    async fn combined_choice_keeps_primary_subject() {
        let vcs = staged_vcs();
        let prompter = ScriptedPrompter::with_selects(&[Some(2), Some(0)]);

        session(&vcs, &prompter, Arc::new(RecordingLlm::default()), options())
            .run()
            .await
            .unwrap();

        let commits = vcs.commits.borrow();
        assert_eq!(
            commits[0],
            "Fix paging\n\n- detail\n\nページングを修正\n\n- detail"
        );
    }

    #[tokio::test]
    async fn yes_commits_primary_without_questions() {
        let vcs = staged_vcs();
        let prompter = ScriptedPrompter::default();
        let opts = RunOptions {
            yes: true,
            ..options()
        };

        let outcome = session(&vcs, &prompter, Arc::new(RecordingLlm::default()), opts)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Committed);
        assert_eq!(*vcs.commits.borrow(), vec!["Fix paging\n\n- detail".to_string()]);
        assert!(prompter.asked.borrow().is_empty());
    }

    #[tokio::test]
    async fn amend_shows_previous_and_asks_before_replacing() {
        let vcs = staged_vcs();
        let prompter = ScriptedPrompter {
            confirms: RefCell::new(VecDeque::from([true])),
            ..ScriptedPrompter::with_selects(&[Some(0), Some(1)])
        };

        let outcome = session(&vcs, &prompter, Arc::new(RecordingLlm::default()), options())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Amended);
        assert_eq!(vcs.amends.borrow().len(), 1);
        assert!(vcs.commits.borrow().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_aborts_before_commit() {
        let vcs = staged_vcs();
        let prompter = ScriptedPrompter::default();
        let opts = RunOptions {
            yes: true,
            ..options()
        };

        let err = session(&vcs, &prompter, Arc::new(FailingLlm), opts)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "generation");
        assert!(vcs.commits.borrow().is_empty());
    }

    #[tokio::test]
    async fn declining_to_stage_cancels() {
        let vcs = FakeVcs {
            status: RepoStatus {
                unstaged: vec!["src/a.rs".into()],
                untracked: vec!["notes.md".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let prompter = ScriptedPrompter {
            confirms: RefCell::new(VecDeque::from([false])),
            ..Default::default()
        };
        let llm = Arc::new(RecordingLlm::default());

        let outcome = session(&vcs, &prompter, llm.clone(), options())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(vcs.added.borrow().is_empty());
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clean_tree_has_nothing_to_commit() {
        let vcs = FakeVcs::default();
        let prompter = ScriptedPrompter::default();

        let outcome = session(&vcs, &prompter, Arc::new(RecordingLlm::default()), options())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::NothingToCommit);
    }

    #[tokio::test]
    async fn dry_run_never_calls_the_model() {
        let vcs = staged_vcs();
        let prompter = ScriptedPrompter::default();
        let llm = Arc::new(RecordingLlm::default());
        let opts = RunOptions {
            dry_run: true,
            context: ContextInput::Given("Fix the off-by-one in paging".into()),
            ..options()
        };

        let outcome = session(&vcs, &prompter, llm.clone(), opts)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::DryRun);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn asked_context_and_branch_issue_reach_the_prompt() {
        let vcs = FakeVcs {
            branch: "feature/42-paging".into(),
            remote: Some("acme/widgets".into()),
            ..staged_vcs()
        };
        let prompter = ScriptedPrompter {
            inputs: RefCell::new(VecDeque::from(["Users lost the last page".to_string()])),
            ..ScriptedPrompter::with_selects(&[None])
        };
        let llm = Arc::new(RecordingLlm::default());
        let tracker = StaticTracker;
        let opts = RunOptions {
            context: ContextInput::Ask,
            issue: IssueLookup::FromBranch,
            ..options()
        };
        let mut s = session(&vcs, &prompter, llm.clone(), opts);
        s.tracker = Some(&tracker);

        let outcome = s.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled);
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts.iter().all(|p| p.contains("Users lost the last page")));
        assert!(prompts.iter().all(|p| p.contains("Paging skips last page")));
    }

    #[tokio::test]
    async fn issue_lookup_failure_is_not_fatal() {
        let vcs = FakeVcs {
            remote: Some("acme/widgets".into()),
            ..staged_vcs()
        };
        let prompter = ScriptedPrompter::default();
        let llm = Arc::new(RecordingLlm::default());
        let tracker = StaticTracker;
        let opts = RunOptions {
            issue: IssueLookup::Number(404),
            yes: true,
            ..options()
        };
        let mut s = session(&vcs, &prompter, llm.clone(), opts);
        s.tracker = Some(&tracker);

        assert_eq!(s.run().await.unwrap(), RunOutcome::Committed);
        assert!(llm.prompts.lock().unwrap().iter().all(|p| !p.contains("<issue")));
    }

    #[test]
    fn options_follow_cli_flags() {
        let cli = Cli {
            context: Some("why".into()),
            no_issue: true,
            ..Cli::default()
        };
        let opts = RunOptions::from_cli(&cli);
        assert_eq!(opts.context, ContextInput::Given("why".into()));
        assert_eq!(opts.issue, IssueLookup::Skip);

        let cli = Cli {
            yes: true,
            issue: Some(7),
            ..Cli::default()
        };
        let opts = RunOptions::from_cli(&cli);
        assert_eq!(opts.context, ContextInput::Skip);
        assert_eq!(opts.issue, IssueLookup::Number(7));
    }
}
