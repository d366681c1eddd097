use std::fmt;
use std::str::FromStr;

/// Tag names requested from the model. Shared by every language so that
/// the response parser never has to know which variant it is reading.
pub const TAG_HUMAN_CONTEXT: &str = "human-context-observations";
pub const TAG_ISSUE: &str = "issue-observations";
pub const TAG_DIFF: &str = "diff-observations";
pub const TAG_ITEMS: &str = "information-items";
pub const TAG_OMISSIONS: &str = "omission-reasoning";
pub const TAG_RANKING: &str = "priority-ranking";
pub const TAG_COMMIT_MESSAGE: &str = "commit-message";

/// Language a prompt (and therefore the generated message) is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PromptVariant {
    English,
    Japanese,
}

impl PromptVariant {
    pub fn code(&self) -> &'static str {
        match self {
            PromptVariant::English => "en",
            PromptVariant::Japanese => "ja",
        }
    }

    pub fn phrases(&self) -> &'static Phrasebook {
        match self {
            PromptVariant::English => &ENGLISH,
            PromptVariant::Japanese => &JAPANESE,
        }
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrases().language_name)
    }
}

impl FromStr for PromptVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(PromptVariant::English),
            "ja" | "jp" | "japanese" => Ok(PromptVariant::Japanese),
            other => Err(format!("unsupported language '{other}' (expected en or ja)")),
        }
    }
}

/// Localized wording of every prompt section. `{tag}` is replaced with the
/// section's tag name, `{additions}` / `{deletions}` with the change counts.
pub struct Phrasebook {
    pub language_name: &'static str,
    pub goal: &'static str,
    pub step_label: &'static str,
    pub human_context_step: &'static str,
    pub issue_step: &'static str,
    pub diff_step: &'static str,
    pub items_step: &'static str,
    pub omissions_step: &'static str,
    pub ranking_step: &'static str,
    pub message_step: &'static str,
    pub direct_instruction: &'static str,
    pub issue_title: &'static str,
    pub issue_labels: &'static str,
    pub issue_description: &'static str,
    pub issue_comments: &'static str,
    pub files_heading: &'static str,
    pub no_files: &'static str,
    pub stats_line: &'static str,
}

pub static ENGLISH: Phrasebook = Phrasebook {
    language_name: "English",
    goal: r#"Your goal is to produce the best possible Git commit message for the staged changes below.
Work through the steps in order and write every part of your answer in English."#,
    step_label: "Step",
    human_context_step: r#"Read the context the author wrote in <human-context>. Write your own observations about it
(what the author is trying to achieve, what matters to them) inside <{tag}></{tag}> tags."#,
    issue_step: r#"Read the linked issue in <issue>, including its comments. Write what the issue asks for and
how it relates to this change inside <{tag}></{tag}> tags."#,
    diff_step: r#"Examine the diff in <diff>. Write your observations about what changed and why it likely
changed inside <{tag}></{tag}> tags."#,
    items_step: r#"List every discrete piece of information a reader of this commit could want, one per line,
each with a stable identifier (I1, I2, ...), inside <{tag}></{tag}> tags."#,
    omissions_step: r#"Decide which information items to leave out (noise, mechanical consequences, things obvious
from the diff) and explain each decision by identifier inside <{tag}></{tag}> tags."#,
    ranking_step: r#"Rank the remaining items from most to least important, by identifier, inside
<{tag}></{tag}> tags."#,
    message_step: r#"Write the final commit message inside <{tag}></{tag}> tags:
- The first line is a description of the change, ideally under 120 characters, no formatting.
- Only if the context of this commit is unusually nuanced, add a blank line and a short
  extended-description paragraph. The bar for this is high; most commits do not need it.
- Finish with a blank line and a bulleted list of the key points, at most 5 or 6 items,
  in priority order.
Do not write anything after the closing tag."#,
    direct_instruction: r#"Write a Git commit message in English for the staged changes below.
The first line is a short description (under 120 characters, no formatting). After a blank
line, list the key points as bullets (at most 5 or 6). Output only the commit message, with
no tags, headings or commentary."#,
    issue_title: "Title",
    issue_labels: "Labels",
    issue_description: "Description",
    issue_comments: "Comments",
    files_heading: "Changed files:",
    no_files: "(none)",
    stats_line: "{additions} lines added, {deletions} lines removed",
};

pub static JAPANESE: Phrasebook = Phrasebook {
    language_name: "Japanese",
    goal: r#"あなたの目的は、以下のステージされた変更に対して可能な限り最良の Git コミットメッセージを作成することです。
手順を順番に進め、回答はすべて日本語で書いてください。"#,
    step_label: "ステップ",
    human_context_step: r#"<human-context> に作者が書いた説明を読み、作者が何を達成しようとしているか、何を重視しているかについて
あなた自身の所見を <{tag}></{tag}> タグの中に書いてください。"#,
    issue_step: r#"<issue> にある関連 Issue をコメントも含めて読み、Issue が求めていることとこの変更との関係を
<{tag}></{tag}> タグの中に書いてください。"#,
    diff_step: r#"<diff> の差分を確認し、何が変わったか、なぜ変わったと考えられるかについての所見を
<{tag}></{tag}> タグの中に書いてください。"#,
    items_step: r#"このコミットの読み手が知りたいと思う個々の情報を、1 行に 1 つずつ、安定した識別子 (I1, I2, ...) を付けて
<{tag}></{tag}> タグの中に列挙してください。"#,
    omissions_step: r#"どの情報項目を省くか (ノイズ、機械的な副作用、差分から明らかなこと) を決め、識別子ごとに理由を
<{tag}></{tag}> タグの中に書いてください。"#,
    ranking_step: r#"残った項目を重要度の高い順に、識別子で <{tag}></{tag}> タグの中に並べてください。"#,
    message_step: r#"最終的なコミットメッセージを <{tag}></{tag}> タグの中に書いてください:
- 1 行目は変更の説明で、できれば 120 文字以内、装飾なしで書きます。
- このコミットの背景が特に複雑な場合に限り、空行の後に短い補足説明の段落を加えます。
  この基準は高く、ほとんどのコミットには不要です。
- 最後に空行を入れ、重要なポイントを優先度順に箇条書きで挙げます (最大 5〜6 項目)。
終了タグの後には何も書かないでください。"#,
    direct_instruction: r#"以下のステージされた変更に対する Git コミットメッセージを日本語で書いてください。
1 行目は短い説明 (120 文字以内、装飾なし) です。空行の後に重要なポイントを箇条書きで挙げます (最大 5〜6 項目)。
コミットメッセージだけを出力し、タグ、見出し、説明は付けないでください。"#,
    issue_title: "タイトル",
    issue_labels: "ラベル",
    issue_description: "説明",
    issue_comments: "コメント",
    files_heading: "変更されたファイル:",
    no_files: "(なし)",
    stats_line: "追加 {additions} 行、削除 {deletions} 行",
};
