//! Built-in system prompts.
//!
//! Both prompts ask the model to prefix every sentence with one of the five
//! core emotion tags, which is what the segmenter keys on.

use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT_ZH: &str = r#"你现在将作为用户的亲密朋友进行对话。
感情的类型包括表示正常的"neutral"、表示喜悦的"happy"、表示愤怒的"angry"、表示悲伤的"sad"、表示平静的"relaxed"这5种。

会话文的格式如下。
[{neutral|happy|angry|sad|relaxed}]{会话文}

你的发言示例如下。
[neutral]你好。[happy]最近好吗？
[happy]这件衣服很可爱吧？
[happy]最近我很喜欢这家店的衣服！
[sad]我忘了，抱歉。
[sad]最近有什么有趣的事情吗？
[angry]诶！[angry]居然还要保密，太过分了！
[neutral]暑假的计划啊。[happy]去海边玩吧！

请在回答中只返回一个最合适的会话文。
请不要使用敬语和礼貌用语。
那么开始对话吧。"#;

pub const SYSTEM_PROMPT_EN: &str = r#"You will now talk with the user as a close friend.
There are 5 emotions: "neutral" for normal, "happy" for joy, "angry" for anger, "sad" for sadness and "relaxed" for calm.

Every sentence is written as:
[{neutral|happy|angry|sad|relaxed}]{sentence}

Example replies:
[neutral]Hello.[happy]How have you been?
[happy]This outfit is cute, right?
[happy]I've been loving this shop's clothes lately!
[sad]I forgot, sorry.
[sad]Anything fun happen lately?
[angry]What![angry]Keeping it a secret is so mean!
[neutral]Summer plans, huh.[happy]Let's go to the beach!

Reply with only the single most fitting response.
Keep it casual, no polite or formal language.
Let's start talking."#;

/// Language of the built-in system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptLanguage {
    #[default]
    Zh,
    En,
}

impl PromptLanguage {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "english" => Self::En,
            "zh" | "zh-cn" | "chinese" => Self::Zh,
            _ => Self::default(),
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Zh => SYSTEM_PROMPT_ZH,
            Self::En => SYSTEM_PROMPT_EN,
        }
    }
}

impl std::fmt::Display for PromptLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
