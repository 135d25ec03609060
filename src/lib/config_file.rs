// SPDX-License-Identifier: Apache-2.0

use std::{
    fs::{File, OpenOptions},
    io::Write,
    os::unix::{fs::PermissionsExt, io::AsRawFd},
    path::{Path, PathBuf},
};

use nix::fcntl::{flock, FlockArg};

use crate::{ErrorKind, NcmError, SectionBuilder};

const CONFIG_FILE_MODE: u32 = 0o644;

/// Exclusive advisory lock scoped to one configuration path. Released when
/// dropped.
#[derive(Debug)]
pub(crate) struct ConfigFileLock {
    _file: File,
}

impl ConfigFileLock {
    pub(crate) fn acquire(path: &Path) -> Result<Self, NcmError> {
        let lock_path = sibling_path(path, "lock");
        create_parent_dir(path)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| {
                persist_error(
                    format!("Failed to open lock file {}", lock_path.display()),
                    e,
                )
            })?;
        flock(file.as_raw_fd(), FlockArg::LockExclusive).map_err(|e| {
            NcmError::new(
                ErrorKind::PersistFailure,
                format!("Failed to lock {}: {e}", lock_path.display()),
            )
        })?;
        Ok(Self { _file: file })
    }
}

/// Read and parse the file at `path`. `NotFound` when it does not exist.
pub fn read(path: &Path) -> Result<SectionBuilder, NcmError> {
    match std::fs::read_to_string(path) {
        Ok(content) => SectionBuilder::parse(&content).map_err(|e| {
            NcmError::new(e.kind(), format!("{}: {}", path.display(), e.msg()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(NcmError::new(
                ErrorKind::NotFound,
                format!("Config file {} does not exist", path.display()),
            ))
        }
        Err(e) => Err(persist_error(
            format!("Failed to read {}", path.display()),
            e,
        )),
    }
}

/// Like [read] but a missing file is an empty one.
pub fn read_or_default(path: &Path) -> Result<SectionBuilder, NcmError> {
    match read(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SectionBuilder::new()),
        r => r,
    }
}

/// Lock `path`, load it (missing file is empty), let `func` edit it and
/// write it back atomically when the content changed.
pub(crate) fn modify<F, T>(
    path: &Path,
    must_exist: bool,
    func: F,
) -> Result<T, NcmError>
where
    F: FnOnce(&mut SectionBuilder) -> Result<T, NcmError>,
{
    let _lock = ConfigFileLock::acquire(path)?;
    let mut sections = if must_exist {
        read(path)?
    } else {
        read_or_default(path)?
    };
    let old = sections.clone();
    let ret = func(&mut sections)?;
    if sections != old || !path.exists() {
        log::debug!("Writing {}", path.display());
        atomic_write(path, sections.to_string().as_str())?;
    }
    Ok(ret)
}

pub fn set_string(
    path: &Path,
    section: &str,
    key: &str,
    value: &str,
) -> Result<(), NcmError> {
    modify(path, false, |sb| {
        sb.set(section, key, value);
        Ok(())
    })
}

pub fn set_bool(
    path: &Path,
    section: &str,
    key: &str,
    value: bool,
) -> Result<(), NcmError> {
    set_string(path, section, key, if value { "yes" } else { "no" })
}

pub fn set_integer(
    path: &Path,
    section: &str,
    key: &str,
    value: i64,
) -> Result<(), NcmError> {
    set_string(path, section, key, value.to_string().as_str())
}

pub fn remove_key(
    path: &Path,
    section: &str,
    key: &str,
) -> Result<(), NcmError> {
    modify(path, true, |sb| {
        sb.unset(section, key);
        Ok(())
    })
}

pub fn remove_section(path: &Path, section: &str) -> Result<(), NcmError> {
    modify(path, true, |sb| {
        sb.remove_sections(section);
        Ok(())
    })
}

pub fn write_full(path: &Path, content: &str) -> Result<(), NcmError> {
    let _lock = ConfigFileLock::acquire(path)?;
    atomic_write(path, content)
}

pub fn append_full(path: &Path, content: &str) -> Result<(), NcmError> {
    let _lock = ConfigFileLock::acquire(path)?;
    let mut old = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(persist_error(
                format!("Failed to read {}", path.display()),
                e,
            ));
        }
    };
    old.try_reserve(content.len())?;
    old.push_str(content);
    atomic_write(path, old.as_str())
}

/// Merge DNS servers and search domains into the `[Resolve]` section of the
/// resolver configuration, keeping existing values first. Return the DNS
/// servers and domains which were not there before.
pub fn write_resolver_config(
    path: &Path,
    dns: &[String],
    domains: &[String],
) -> Result<(Vec<String>, Vec<String>), NcmError> {
    modify(path, false, |sb| {
        let section = sb.section_or_insert("Resolve");
        let added_dns = merge_words(section, "DNS", dns);
        let added_domains = merge_words(section, "Domains", domains);
        if section.is_bare() {
            sb.remove_sections_if("Resolve", |s| s.is_bare());
        }
        Ok((added_dns, added_domains))
    })
}

/// Append `values` to the space separated `key`, skipping known ones.
/// Return the appended values.
pub(crate) fn merge_words(
    section: &mut crate::Section,
    key: &str,
    values: &[String],
) -> Vec<String> {
    let mut words = section.get_words(key);
    let mut added = Vec::new();
    for value in values {
        if !words.contains(value) {
            words.push(value.clone());
            added.push(value.clone());
        }
    }
    if !added.is_empty() {
        section.set(key, words.join(" ").as_str());
    }
    added
}

/// Drop `values` from the space separated `key`, removing the key when no
/// value is left. Return whether anything changed.
pub(crate) fn remove_words(
    section: &mut crate::Section,
    key: &str,
    values: &[String],
) -> bool {
    let words = section.get_words(key);
    let remains: Vec<String> =
        words.iter().filter(|w| !values.contains(w)).cloned().collect();
    if remains.len() == words.len() {
        return false;
    }
    if remains.is_empty() {
        section.unset(key);
    } else {
        section.set(key, remains.join(" ").as_str());
    }
    true
}

pub(crate) fn remove_file(path: &Path) -> Result<bool, NcmError> {
    let _lock = ConfigFileLock::acquire(path)?;
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(persist_error(
            format!("Failed to remove {}", path.display()),
            e,
        )),
    }
}

// Readers (including the managed daemon) only ever see the old or the new
// content.
fn atomic_write(path: &Path, content: &str) -> Result<(), NcmError> {
    create_parent_dir(path)?;
    let tmp_path = sibling_path(path, &format!("tmp{}", std::process::id()));
    let write_tmp = || -> std::io::Result<()> {
        let mut fd = File::create(&tmp_path)?;
        fd.write_all(content.as_bytes())?;
        fd.set_permissions(std::fs::Permissions::from_mode(CONFIG_FILE_MODE))?;
        fd.sync_all()
    };
    if let Err(e) = write_tmp() {
        std::fs::remove_file(&tmp_path).ok();
        return Err(persist_error(
            format!("Failed to write {}", tmp_path.display()),
            e,
        ));
    }
    std::fs::rename(&tmp_path, path).map_err(|e| {
        std::fs::remove_file(&tmp_path).ok();
        persist_error(
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            ),
            e,
        )
    })
}

fn create_parent_dir(path: &Path) -> Result<(), NcmError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| {
            persist_error(
                format!("Failed to create folder {}", dir.display()),
                e,
            )
        })?;
    }
    Ok(())
}

// `/etc/foo/bar.conf` -> `/etc/foo/.bar.conf.<suffix>`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.{suffix}"))
}

fn persist_error(msg: String, e: std::io::Error) -> NcmError {
    let kind = if e.kind() == std::io::ErrorKind::OutOfMemory {
        ErrorKind::OutOfMemory
    } else {
        ErrorKind::PersistFailure
    };
    NcmError::new(kind, format!("{msg}: {e}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_and_remove_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("10-eth0.network");
        set_string(&path, "Match", "Name", "eth0").unwrap();
        set_bool(&path, "Network", "IPv6AcceptRA", false).unwrap();
        set_integer(&path, "Link", "MTUBytes", 9000).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[Match]\nName=eth0\n\n[Network]\nIPv6AcceptRA=no\n\n\
             [Link]\nMTUBytes=9000\n"
        );
        remove_key(&path, "Network", "IPv6AcceptRA").unwrap();
        remove_section(&path, "Link").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[Match]\nName=eth0\n"
        );
    }

    #[test]
    fn test_remove_key_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.network");
        let e = remove_key(&path, "Network", "DNS").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_write_and_append_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.conf");
        write_full(&path, "[A]\nB=1\n").unwrap();
        append_full(&path, "\n[C]\nD=2\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[A]\nB=1\n\n[C]\nD=2\n"
        );
        // No temporary file left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_resolver_config_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.conf");
        write_full(&path, "[Resolve]\nDNS=192.0.2.1\n").unwrap();
        let (dns, domains) = write_resolver_config(
            &path,
            &["192.0.2.1".to_string(), "192.0.2.53".to_string()],
            &["example.org".to_string()],
        )
        .unwrap();
        assert_eq!(dns, vec!["192.0.2.53".to_string()]);
        assert_eq!(domains, vec!["example.org".to_string()]);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[Resolve]\nDNS=192.0.2.1 192.0.2.53\nDomains=example.org\n"
        );
    }
}
