use crate::llm::{CompletionClient, CompletionError, CompletionRequest};

// Below this, the extracted text is too thin to summarize from.
pub const MIN_ARTICLE_CHARS: usize = 50;

/// Single user-role prompt. Target output is Japanese: a three-line
/// summary plus bullet key points. With too little text the model is told
/// to infer from the title and not to refuse.
pub fn build_prompt(title: &str, text: &str) -> String {
    if text.trim().chars().count() < MIN_ARTICLE_CHARS {
        format!(
            "記事本文を取得できませんでした。タイトル「{title}」から内容を推測し、\n\
             日本語で3行要約と重要ポイントの箇条書きを出力してください。\n\
             情報が不足していても回答を拒否せず、必ず推測した要約を出力してください。"
        )
    } else {
        format!(
            "以下の記事を日本語で3行要約し、\n\
             重要ポイントを箇条書きで出力してください。\n\
             ---\n\
             {text}"
        )
    }
}

pub async fn summarize(
    llm: &dyn CompletionClient,
    model: Option<&str>,
    title: &str,
    text: &str,
) -> Result<String, CompletionError> {
    let request = CompletionRequest {
        model: model.map(str::to_string),
        prompt: build_prompt(title, text),
    };
    let summary = llm.complete(request).await?;
    Ok(summary.trim().to_string())
}
