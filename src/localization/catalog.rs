//! 语言目录
//!
//! 只读的受支持语言列表，其中恰好一个是源语言

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::localization::error::{LocalizationError, LocalizationResult};

/// 源语言默认值
pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";

/// 一个受支持的语言
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// 语言标识（如 "hi"、"pt-br"）
    pub code: String,
    /// 英文名称
    pub name: String,
    /// 本地名称
    pub native_name: String,
}

impl Language {
    pub fn new(code: &str, name: &str, native_name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            native_name: native_name.to_string(),
        }
    }
}

/// 检查语言标识是否为合法的语言标签
pub fn is_valid_language_code(code: &str) -> bool {
    static LANGUAGE_TAG: OnceLock<Regex> = OnceLock::new();
    LANGUAGE_TAG
        .get_or_init(|| {
            Regex::new(r"^[a-z]{2,3}(-[a-z0-9]{2,8})*$").expect("language tag pattern is valid")
        })
        .is_match(code)
}

/// 语言目录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCatalog {
    source: String,
    languages: Vec<Language>,
}

impl LanguageCatalog {
    /// 创建语言目录，源语言必须在列表中
    pub fn new(source: &str, languages: Vec<Language>) -> LocalizationResult<Self> {
        if let Some(bad) = languages.iter().find(|l| !is_valid_language_code(&l.code)) {
            return Err(LocalizationError::ConfigError(format!(
                "非法语言标识: '{}'",
                bad.code
            )));
        }

        for (i, language) in languages.iter().enumerate() {
            if languages[..i].iter().any(|l| l.code == language.code) {
                return Err(LocalizationError::ConfigError(format!(
                    "语言标识重复: '{}'",
                    language.code
                )));
            }
        }

        if !languages.iter().any(|l| l.code == source) {
            return Err(LocalizationError::ConfigError(format!(
                "源语言 '{}' 不在语言目录中",
                source
            )));
        }

        Ok(Self {
            source: source.to_string(),
            languages,
        })
    }

    /// 内置语言目录，源语言可替换
    pub fn builtin(source: &str) -> LocalizationResult<Self> {
        Self::new(source, builtin_languages())
    }

    /// 源语言标识
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 是否为源语言
    pub fn is_source(&self, code: &str) -> bool {
        self.source == code
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn get(&self, code: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.code == code)
    }

    /// 按目录顺序返回全部语言
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// 解析语言标识，未知语言返回错误
    pub fn resolve(&self, code: &str) -> LocalizationResult<&Language> {
        let normalized = code.trim().to_lowercase();
        self.get(&normalized)
            .ok_or_else(|| LocalizationError::UnknownLanguage(code.to_string()))
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_LANGUAGE.to_string(),
            languages: builtin_languages(),
        }
    }
}

fn builtin_languages() -> Vec<Language> {
    vec![
        Language::new("en", "English", "English"),
        Language::new("hi", "Hindi", "हिन्दी"),
        Language::new("te", "Telugu", "తెలుగు"),
        Language::new("ta", "Tamil", "தமிழ்"),
        Language::new("bn", "Bengali", "বাংলা"),
        Language::new("mr", "Marathi", "मराठी"),
        Language::new("gu", "Gujarati", "ગુજરાતી"),
        Language::new("kn", "Kannada", "ಕನ್ನಡ"),
        Language::new("ml", "Malayalam", "മലയാളം"),
        Language::new("pa", "Punjabi", "ਪੰਜਾਬੀ"),
        Language::new("ur", "Urdu", "اردو"),
        Language::new("es", "Spanish", "Español"),
        Language::new("fr", "French", "Français"),
        Language::new("de", "German", "Deutsch"),
    ]
}
