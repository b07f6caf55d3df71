//! 语言偏好存储
//!
//! 只保存一个键：用户最后选择的语言代码。所有读写都是同步且尽力而为的，
//! 失败时记录日志并视为"没有保存的偏好"。

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};

use redb::{Database, TableDefinition};

use crate::localization::error::{helpers, LocalizationError, LocalizationResult};

const PREFERENCES: TableDefinition<&str, &str> = TableDefinition::new("preferences");
const LANGUAGE_KEY: &str = "language";

/// 偏好存储接口
pub trait PreferenceStore {
    /// 读取保存的语言代码，从未保存过时返回 `None`
    fn try_load(&self) -> LocalizationResult<Option<String>>;

    fn try_save(&self, language: &str) -> LocalizationResult<()>;

    /// 尽力读取，失败时视为无偏好
    fn load(&self) -> Option<String> {
        match self.try_load() {
            Ok(language) => language,
            Err(e) => {
                tracing::warn!("读取语言偏好失败，视为无偏好: {}", e);
                None
            }
        }
    }

    /// 尽力保存，返回是否成功
    fn save(&self, language: &str) -> bool {
        match self.try_save(language) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("保存语言偏好失败: {}", e);
                false
            }
        }
    }
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for &S {
    fn try_load(&self) -> LocalizationResult<Option<String>> {
        (**self).try_load()
    }

    fn try_save(&self, language: &str) -> LocalizationResult<()> {
        (**self).try_save(language)
    }
}

/// 基于 redb 的持久化偏好存储
pub struct RedbPreferenceStore {
    path: PathBuf,
    db: Option<Database>,
    open_error: Option<String>,
}

impl RedbPreferenceStore {
    /// 打开或创建数据库
    ///
    /// 打开失败不会返回错误：存储降级为不可用，之后的读写都按失败处理
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        match Self::create_database(&path) {
            Ok(db) => {
                tracing::debug!("语言偏好数据库已打开: {}", path.display());
                Self {
                    path,
                    db: Some(db),
                    open_error: None,
                }
            }
            Err(e) => {
                tracing::warn!("无法打开语言偏好数据库 {}: {}", path.display(), e);
                Self {
                    path,
                    db: None,
                    open_error: Some(e.to_string()),
                }
            }
        }
    }

    fn create_database(path: &Path) -> LocalizationResult<Database> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    helpers::storage_error(format!("无法创建目录 {}: {}", parent.display(), e))
                })?;
            }
        }
        Database::create(path)
            .map_err(|e| LocalizationError::from(redb::Error::from(e)).with_context(path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_available(&self) -> bool {
        self.db.is_some()
    }

    fn database(&self) -> LocalizationResult<&Database> {
        self.db.as_ref().ok_or_else(|| {
            helpers::storage_error(format!(
                "数据库不可用: {}",
                self.open_error.as_deref().unwrap_or("未打开")
            ))
        })
    }
}

impl fmt::Debug for RedbPreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbPreferenceStore")
            .field("path", &self.path)
            .field("available", &self.db.is_some())
            .finish()
    }
}

impl PreferenceStore for RedbPreferenceStore {
    fn try_load(&self) -> LocalizationResult<Option<String>> {
        let txn = self.database()?.begin_read().map_err(redb::Error::from)?;
        let table = match txn.open_table(PREFERENCES) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(redb::Error::from(e).into()),
        };

        let language = table
            .get(LANGUAGE_KEY)
            .map_err(redb::Error::from)?
            .map(|guard| guard.value().to_string());
        Ok(language)
    }

    fn try_save(&self, language: &str) -> LocalizationResult<()> {
        let txn = self.database()?.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = txn.open_table(PREFERENCES).map_err(redb::Error::from)?;
            table
                .insert(LANGUAGE_KEY, language)
                .map_err(redb::Error::from)?;
        }
        txn.commit().map_err(redb::Error::from)?;

        tracing::debug!("语言偏好已保存: {}", language);
        Ok(())
    }
}

/// 进程内偏好存储
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    language: RefCell<Option<String>>,
    failing: Cell<bool>,
    saves: Cell<usize>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(language: &str) -> Self {
        let store = Self::default();
        *store.language.borrow_mut() = Some(language.to_string());
        store
    }

    /// 之后的所有读写都失败
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// 成功保存的次数
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    fn check(&self) -> LocalizationResult<()> {
        if self.failing.get() {
            Err(helpers::storage_error("存储不可用"))
        } else {
            Ok(())
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn try_load(&self) -> LocalizationResult<Option<String>> {
        self.check()?;
        Ok(self.language.borrow().clone())
    }

    fn try_save(&self, language: &str) -> LocalizationResult<()> {
        self.check()?;
        *self.language.borrow_mut() = Some(language.to_string());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
