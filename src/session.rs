//! The session: the one place that owns mutable state. Active table,
//! auxiliary table cache, last-exported path, persisted settings, and the
//! Empty -> Loaded -> Dirty lifecycle around them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use polars::prelude::DataFrame;

use crate::compare::{self, Comparison};
use crate::config::{ConfigManager, Settings};
use crate::error::{Error, Result};
use crate::lookup::{self, MatchMode, MatchResult};
use crate::table::Table;
use crate::{chart, dedup, statistics, xlsx};

/// Backups land in this directory next to the file being overwritten.
const BACKUP_DIR: &str = "backups";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Empty,
    /// A table is present with no unsaved edits.
    Loaded,
    /// Edits were applied since the last save or export.
    Dirty,
}

pub struct Session {
    state: SessionState,
    table: Option<Table>,
    /// Tables loaded for lookup or comparison, cached for the session's
    /// lifetime. Never evicted; a reload goes through `open`.
    aux: HashMap<PathBuf, Table>,
    last_exported: Option<PathBuf>,
    settings: Settings,
    config: ConfigManager,
}

impl Session {
    pub fn new(config: ConfigManager) -> Session {
        let settings = config.load_settings();
        Session {
            state: SessionState::Empty,
            table: None,
            aux: HashMap::new(),
            last_exported: settings.last_exported.clone(),
            settings,
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_exported(&self) -> Option<&Path> {
        self.last_exported.as_deref()
    }

    /// Load a workbook as the new active table, replacing any previous one
    /// and clearing the dirty state. The table is also added to the
    /// auxiliary cache so lookups can target it by path.
    pub fn open(&mut self, path: &Path, sheet: Option<&str>) -> Result<()> {
        let table = Table::load(path, sheet)?;
        self.aux.insert(table.path.clone(), table.clone());
        self.table = Some(table);
        self.state = SessionState::Loaded;
        self.settings.last_opened = Some(path.to_path_buf());
        self.persist_settings();
        Ok(())
    }

    /// Re-read a different sheet of the active workbook.
    pub fn switch_sheet(&mut self, sheet: &str) -> Result<()> {
        let path = self.active()?.path.clone();
        let table = Table::load(&path, Some(sheet))?;
        self.table = Some(table);
        self.state = SessionState::Loaded;
        Ok(())
    }

    pub fn set_cell(&mut self, row: usize, column: &str, raw: &str) -> Result<()> {
        self.active_mut()?.set_cell(row, column, raw)?;
        self.state = SessionState::Dirty;
        Ok(())
    }

    pub fn trim_whitespace(&mut self) -> Result<()> {
        self.active_mut()?.trim_whitespace()?;
        self.state = SessionState::Dirty;
        Ok(())
    }

    /// Deduplicate the active table in place; returns the removed count.
    pub fn dedupe(&mut self, key: &str) -> Result<usize> {
        let table = self.active_mut()?;
        let (cleaned, removed) = dedup::dedupe(&table.df, key)?;
        table.df = cleaned;
        self.state = SessionState::Dirty;
        Ok(removed)
    }

    /// Deduplicate into a new workbook without touching the active table.
    pub fn dedupe_to_file(&mut self, key: &str, out: &Path) -> Result<PathBuf> {
        let (cleaned, _) = dedup::dedupe(&self.active()?.df, key)?;
        let written = xlsx::save_sheets(out, &[("Cleaned".to_string(), cleaned)])?;
        self.record_export(&written);
        Ok(written)
    }

    /// Find rows in the active table, or in an auxiliary file when `path`
    /// is given (loading and caching it on first use).
    pub fn lookup(
        &mut self,
        path: Option<&Path>,
        column: &str,
        query: &str,
        mode: MatchMode,
    ) -> Result<MatchResult> {
        let df = match path {
            Some(path) => &self.aux_table(path)?.df,
            None => &self.active()?.df,
        };
        lookup::find(df, column, query, mode)
    }

    /// Compare two workbooks by key column. Both files are re-read fresh;
    /// the auxiliary cache is deliberately not consulted.
    pub fn compare_files(
        &self,
        left: &Path,
        key_left: &str,
        right: &Path,
        key_right: &str,
    ) -> Result<Comparison> {
        let left_table = Table::load(left, None)?;
        let right_table = Table::load(right, None)?;
        compare::compare(&left_table.df, key_left, &right_table.df, key_right)
    }

    /// Compare and export the three partitions as one workbook.
    pub fn compare_to_file(
        &mut self,
        left: &Path,
        key_left: &str,
        right: &Path,
        key_right: &str,
        out: &Path,
    ) -> Result<(PathBuf, Comparison)> {
        let comparison = self.compare_files(left, key_left, right, key_right)?;
        let sheets = vec![
            ("Matches".to_string(), comparison.matched.clone()),
            ("Only_in_file1".to_string(), comparison.only_left.clone()),
            ("Only_in_file2".to_string(), comparison.only_right.clone()),
        ];
        let written = xlsx::save_sheets(out, &sheets)?;
        self.record_export(&written);
        Ok((written, comparison))
    }

    pub fn describe(&self) -> Result<DataFrame> {
        statistics::describe(&self.active()?.df)
    }

    pub fn correlation(&self) -> Result<DataFrame> {
        statistics::correlation_matrix(&self.active()?.df)
    }

    pub fn chart(
        &self,
        kind: chart::ChartKind,
        x: Option<&str>,
        y: &str,
        out: &Path,
    ) -> Result<PathBuf> {
        chart::render(&self.active()?.df, kind, x, y, out)
    }

    /// Export the active table to a new workbook; clears the dirty state.
    pub fn export(&mut self, out: &Path) -> Result<PathBuf> {
        let table = self.active()?;
        let sheets = vec![(table.sheet.clone(), table.df.clone())];
        let written = xlsx::save_sheets(out, &sheets)?;
        self.record_export(&written);
        self.state = SessionState::Loaded;
        Ok(written)
    }

    /// Export an arbitrary result frame (lookup matches, statistics) under
    /// the given sheet name. Leaves the active table's state untouched.
    pub fn export_frame(&mut self, sheet: &str, df: &DataFrame, out: &Path) -> Result<PathBuf> {
        let written = xlsx::save_sheets(out, &[(sheet.to_string(), df.clone())])?;
        self.record_export(&written);
        Ok(written)
    }

    /// Overwrite the active table's source file, backing up the previous
    /// on-disk copy first. The backup is best-effort: a failure is logged
    /// and the save proceeds regardless.
    pub fn save(&mut self) -> Result<PathBuf> {
        let table = self.active()?;
        let path = table.path.clone();
        if let Err(e) = backup_existing(&path) {
            eprintln!("Warning: could not back up {}: {}", path.display(), e);
        }
        let sheets = vec![(table.sheet.clone(), table.df.clone())];
        let written = xlsx::save_sheets(&path, &sheets)?;
        self.record_export(&written);
        self.state = SessionState::Loaded;
        Ok(written)
    }

    /// Write the active table to a different path. The active table keeps
    /// pointing at its original source.
    pub fn save_as(&mut self, out: &Path) -> Result<PathBuf> {
        let table = self.active()?;
        let sheets = vec![(table.sheet.clone(), table.df.clone())];
        let written = xlsx::save_sheets(out, &sheets)?;
        self.record_export(&written);
        self.state = SessionState::Loaded;
        Ok(written)
    }

    /// Update the saved SMTP settings; the sender is only kept when asked.
    pub fn remember_smtp(&mut self, server: &str, sender: &str, remember: bool) {
        self.settings.smtp.remember = remember;
        if remember {
            self.settings.smtp.server = Some(server.to_string());
            self.settings.smtp.sender = Some(sender.to_string());
        } else {
            self.settings.smtp.server = None;
            self.settings.smtp.sender = None;
        }
        self.persist_settings();
    }

    fn aux_table(&mut self, path: &Path) -> Result<&Table> {
        if !self.aux.contains_key(path) {
            let table = Table::load(path, None)?;
            self.aux.insert(path.to_path_buf(), table);
        }
        Ok(&self.aux[path])
    }

    fn active(&self) -> Result<&Table> {
        self.table
            .as_ref()
            .ok_or_else(|| Error::Unsupported("no file loaded".into()))
    }

    fn active_mut(&mut self) -> Result<&mut Table> {
        self.table
            .as_mut()
            .ok_or_else(|| Error::Unsupported("no file loaded".into()))
    }

    fn record_export(&mut self, path: &Path) {
        self.last_exported = Some(path.to_path_buf());
        self.settings.last_exported = Some(path.to_path_buf());
        self.persist_settings();
    }

    fn persist_settings(&self) {
        if let Err(e) = self.config.save_settings(&self.settings) {
            eprintln!("Warning: could not save settings: {}", e);
        }
    }
}

/// Copy the current on-disk file into the backup directory with a
/// timestamp prefix. Archival only; never read back.
fn backup_existing(path: &Path) -> std::io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent.join(BACKUP_DIR);
    std::fs::create_dir_all(&backup_dir)?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("backup.xlsx");
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = backup_dir.join(format!("{stamp}_{filename}"));
    std::fs::copy(path, &backup_path)?;
    Ok(Some(backup_path))
}
