//! 数据格式版本守卫
//!
//! 存储根目录下的 `store.properties` 文件中，`version` 项记录最近一次写入所用的
//! 数据格式版本。应用拒绝操作由更新版本的自身写入的数据。
//!
use crate::error::{StoreError, StoreResult as Result};
use crate::fsio;
use chrono::Local;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const PROPERTIES_FILE: &str = "store.properties";
pub const VERSION_KEY: &str = "version";

/// 经典 `.properties` 文本格式的 `key=value` 属性文件。
///
/// 支持：`#`/`!` 注释行；`=`、`:` 或空白分隔符；反斜杠续行；
/// 转义 `\t \n \r \f \uXXXX` 以及转义字面量（`\=`、`\:`、`\ `、`\\` 等）。
/// 文件按 UTF-8 而非 ISO-8859-1 读写，非 ASCII 文本原样写出。
/// 保留插入顺序，改写文件时只变动被设置的条目。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    pub fn parse(text: &str) -> Self {
        let mut props = Self::default();
        for line in logical_lines(text) {
            let (key, value) = split_entry(&line);
            props.set(unescape(key), unescape(value));
        }
        props
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 渲染为文本，带头部注释和时间戳行。
    pub fn render(&self, comment: &str) -> String {
        let mut out = format!(
            "#{comment}\n#{}\n",
            Local::now().format("%a %b %d %H:%M:%S %z %Y")
        );
        for (k, v) in &self.entries {
            escape_into(&mut out, k, true);
            out.push('=');
            escape_into(&mut out, v, false);
            out.push('\n');
        }
        out
    }

    /// 文件不存在时返回 `Ok(None)`。
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse(&text))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path, comment: &str) -> Result<()> {
        let tmp_path = path.with_extension("properties.tmp");
        fsio::atomic_write_file(&tmp_path, path, self.render(comment).as_bytes())
    }
}

// 拼接反斜杠续行，去掉空行和注释
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<String> = None;
    for raw in text.lines() {
        let trimmed = raw.trim_start_matches([' ', '\t', '\x0c']);
        let line = match current.take() {
            Some(mut acc) => {
                acc.push_str(trimmed);
                acc
            }
            None => {
                if trimmed.is_empty() || trimmed.starts_with(['#', '!']) {
                    continue;
                }
                trimmed.to_string()
            }
        };
        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            let mut line = line;
            line.pop();
            current = Some(line);
        } else {
            lines.push(line);
        }
    }
    // 末行的续行符直接结束该条目
    lines.extend(current);
    lines
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

// 键在第一个未转义的 `=`、`:` 或空白处结束
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_blank(c) {
            key_end = i;
            break;
        }
    }
    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches(is_blank);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches(is_blank);
    }
    (key, rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    // 非法转义：保留原文
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape_into(out: &mut String, text: &str, is_key: bool) {
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}

/// 防止操作由更新版本应用写入的存储目录。
#[derive(Debug)]
pub struct VersionGuard {
    dir: PathBuf,
    expected_version: i64,
    checked: bool,
    saved: bool,
}

impl VersionGuard {
    pub fn new(dir: impl Into<PathBuf>, expected_version: i64) -> Self {
        Self {
            dir: dir.into(),
            expected_version,
            checked: false,
            saved: false,
        }
    }

    /// 只有期望版本为正数时才进行校验。
    pub fn enabled(&self) -> bool {
        self.expected_version > 0
    }

    pub fn expected_version(&self) -> i64 {
        self.expected_version
    }

    pub fn properties_path(&self) -> PathBuf {
        self.dir.join(PROPERTIES_FILE)
    }

    /// 磁盘上记录的版本（如有）。空值视为缺失。
    pub fn stored_version(&self) -> Result<Option<i64>> {
        let path = self.properties_path();
        let Some(props) = Properties::load(&path)? else {
            return Ok(None);
        };
        match props.get(VERSION_KEY) {
            None => Ok(None),
            Some(v) if v.trim().is_empty() => Ok(None),
            Some(v) => v
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StoreError::InvalidVersionMarker {
                    path,
                    value: v.to_string(),
                }),
        }
    }

    /// 存储版本高于期望版本时返回 `DataTooNew`。
    ///
    /// 每个守卫最多成功一次；失败的校验会在下次调用时重做。
    pub fn check_compatibility(&mut self) -> Result<()> {
        if self.checked {
            return Ok(());
        }
        if self.enabled() {
            if let Some(data_version) = self.stored_version()? {
                if data_version > self.expected_version {
                    return Err(StoreError::DataTooNew {
                        dir: self.dir.clone(),
                        app_version: self.expected_version,
                        data_version,
                    });
                }
            }
        }
        self.checked = true;
        Ok(())
    }

    /// 将期望版本写入标记文件，保留其它所有属性。每个守卫最多执行一次。
    pub fn record_version(&mut self) -> Result<()> {
        if self.saved {
            return Ok(());
        }
        if !self.enabled() {
            self.saved = true;
            return Ok(());
        }
        self.check_compatibility()?;

        let path = self.properties_path();
        let mut props = Properties::load(&path)?.unwrap_or_default();
        props.set(VERSION_KEY, self.expected_version.to_string());
        props.save(&path, "entity_store::FileEntityStore")?;
        self.saved = true;

        tracing::debug!(path = %path.display(), version = self.expected_version, "recorded data version");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_marker(dir: &Path, text: &str) {
        fs::write(dir.join(PROPERTIES_FILE), text).unwrap();
    }

    #[test]
    fn parse_properties() {
        let props = Properties::parse("# header\n! other\n\nversion=3\nowner : ops\n  flag\n");
        assert_eq!(props.get("version"), Some("3"));
        assert_eq!(props.get("owner"), Some("ops"));
        assert_eq!(props.get("flag"), Some(""));
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn continuations_and_escapes() {
        let text = "motd = first line \\\n    second line\nurl=http\\://host\\=1\npath\\ name:a\\\\b\ntab=\\tx \\u00e9\n";
        let props = Properties::parse(text);
        assert_eq!(props.get("motd"), Some("first line second line"));
        assert_eq!(props.get("url"), Some("http://host=1"));
        assert_eq!(props.get("path name"), Some("a\\b"));
        assert_eq!(props.get("tab"), Some("\tx \u{e9}"));
        assert_eq!(props.len(), 4);
    }

    #[test]
    fn continued_comment_marker_is_a_value_not_a_comment() {
        let props = Properties::parse("list=a,\\\n  #b\n");
        assert_eq!(props.get("list"), Some("a,#b"));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn render_escapes_what_parse_unescapes() {
        let mut props = Properties::default();
        props.set("key with=sep", " leading space, trailing\\");
        props.set("multi", "one\ntwo");
        props.set(VERSION_KEY, "4");
        let text = props.render("header");
        assert!(text.contains("key\\ with\\=sep=\\ leading space, trailing\\\\\n"), "{text}");
        assert_eq!(Properties::parse(&text), props);
    }

    #[test]
    fn record_keeps_continued_foreign_property_intact() {
        let tmp = TempDir::new().unwrap();
        write_marker(
            tmp.path(),
            "servers = alpha,\\\n          beta\nversion=2\n",
        );
        let mut guard = VersionGuard::new(tmp.path(), 3);
        guard.record_version().unwrap();

        let props = Properties::load(&guard.properties_path()).unwrap().unwrap();
        assert_eq!(props.get("servers"), Some("alpha,beta"));
        assert_eq!(props.get(VERSION_KEY), Some("3"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn missing_marker_is_compatible() {
        let tmp = TempDir::new().unwrap();
        let mut guard = VersionGuard::new(tmp.path(), 3);
        guard.check_compatibility().unwrap();
        assert_eq!(guard.stored_version().unwrap(), None);
    }

    #[test]
    fn newer_data_is_refused_every_time() {
        let tmp = TempDir::new().unwrap();
        write_marker(tmp.path(), "version=5\n");
        let mut guard = VersionGuard::new(tmp.path(), 3);

        for _ in 0..2 {
            match guard.check_compatibility().unwrap_err() {
                StoreError::DataTooNew {
                    app_version,
                    data_version,
                    ..
                } => {
                    assert_eq!(app_version, 3);
                    assert_eq!(data_version, 5);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn older_or_equal_data_is_accepted() {
        let tmp = TempDir::new().unwrap();
        write_marker(tmp.path(), "version=3\n");
        VersionGuard::new(tmp.path(), 3)
            .check_compatibility()
            .unwrap();
        VersionGuard::new(tmp.path(), 4)
            .check_compatibility()
            .unwrap();
    }

    #[test]
    fn disabled_guard_ignores_marker() {
        let tmp = TempDir::new().unwrap();
        write_marker(tmp.path(), "version=99\n");
        let mut guard = VersionGuard::new(tmp.path(), 0);
        guard.check_compatibility().unwrap();
        guard.record_version().unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join(PROPERTIES_FILE)).unwrap(),
            "version=99\n"
        );
    }

    #[test]
    fn blank_version_is_compatible_but_garbage_is_not() {
        let tmp = TempDir::new().unwrap();
        write_marker(tmp.path(), "version=\n");
        VersionGuard::new(tmp.path(), 1)
            .check_compatibility()
            .unwrap();

        write_marker(tmp.path(), "version=three\n");
        let err = VersionGuard::new(tmp.path(), 1)
            .check_compatibility()
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidVersionMarker { .. }));
    }

    #[test]
    fn record_keeps_other_properties() {
        let tmp = TempDir::new().unwrap();
        write_marker(tmp.path(), "# written by hand\nowner=ops\nversion=2\n");
        let mut guard = VersionGuard::new(tmp.path(), 3);
        guard.record_version().unwrap();

        let text = fs::read_to_string(tmp.path().join(PROPERTIES_FILE)).unwrap();
        let props = Properties::parse(&text);
        assert_eq!(props.get("owner"), Some("ops"));
        assert_eq!(props.get(VERSION_KEY), Some("3"));
        assert!(text.starts_with("#entity_store::FileEntityStore\n"));
    }

    #[test]
    fn record_refuses_to_downgrade_marker() {
        let tmp = TempDir::new().unwrap();
        write_marker(tmp.path(), "version=7\n");
        let mut guard = VersionGuard::new(tmp.path(), 3);
        assert!(matches!(
            guard.record_version().unwrap_err(),
            StoreError::DataTooNew { .. }
        ));
        let props = Properties::load(&guard.properties_path()).unwrap().unwrap();
        assert_eq!(props.get(VERSION_KEY), Some("7"));
    }

    #[test]
    fn record_creates_missing_store_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("fresh");
        let mut guard = VersionGuard::new(&dir, 3);
        guard.record_version().unwrap();
        assert_eq!(guard.stored_version().unwrap(), Some(3));
    }
}
