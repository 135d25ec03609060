// SPDX-License-Identifier: Apache-2.0

use crate::{ErrorKind, NcmError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry(String, String),
    // Comment or blank line, rendered back untouched
    Verbatim(String),
}

impl Line {
    fn is_blank(&self) -> bool {
        matches!(self, Self::Verbatim(l) if l.trim().is_empty())
    }

    fn is_key(&self, key: &str) -> bool {
        matches!(self, Self::Entry(k, _) if k == key)
    }
}

fn is_trivia(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with(';')
}

/// One `[Name]` block of an ini-style file holding ordered `Key=Value`
/// entries.
///
/// A section with empty name is rendered without header, which is how
/// shell-style environment files (e.g. the proxy file) are represented.
/// Comments and blank lines of a parsed file are kept in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    name: String,
    lines: Vec<Line>,
    // Lines ahead of the header as found in the parsed file, none for a
    // section created here.
    leading: Option<Vec<String>>,
    allow_duplicate_keys: bool,
}

impl Section {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Section in which [Section::set] appends instead of overriding, for
    /// keys like `VLAN=` which may repeat.
    pub fn new_multi_value(name: &str) -> Self {
        Self {
            name: name.to_string(),
            allow_duplicate_keys: true,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn allow_duplicate_keys(&self) -> bool {
        self.allow_duplicate_keys
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|l| match l {
            Line::Entry(k, v) => Some((k.as_str(), v.as_str())),
            Line::Verbatim(_) => None,
        })
    }

    /// No `key=value` entry.
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Neither entry nor comment, safe to drop.
    pub fn is_bare(&self) -> bool {
        self.lines.iter().all(|l| l.is_blank())
    }

    /// Override the first entry holding `key` in place, or append a new one.
    /// For sections allowing duplicate keys, append unless the identical
    /// pair already exists.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        if self.allow_duplicate_keys {
            return self.append(key, value);
        }
        let mut found = false;
        self.lines.retain_mut(|line| match line {
            Line::Entry(k, v) if k == key => {
                if found {
                    false
                } else {
                    found = true;
                    *v = value.to_string();
                    true
                }
            }
            _ => true,
        });
        if !found {
            self.push_entry(key, value);
        }
        self
    }

    pub fn set_bool(&mut self, key: &str, value: bool) -> &mut Self {
        self.set(key, if value { "yes" } else { "no" })
    }

    pub fn set_opt<T: std::fmt::Display>(
        &mut self,
        key: &str,
        value: Option<T>,
    ) -> &mut Self {
        if let Some(v) = value {
            self.set(key, v.to_string().as_str());
        }
        self
    }

    pub fn set_opt_bool(
        &mut self,
        key: &str,
        value: Option<bool>,
    ) -> &mut Self {
        if let Some(v) = value {
            self.set_bool(key, v);
        }
        self
    }

    /// Append `key=value` unless the identical pair already exists.
    pub fn append(&mut self, key: &str, value: &str) -> &mut Self {
        if !self.entries().any(|(k, v)| k == key && v == value) {
            self.push_entry(key, value);
        }
        self
    }

    // New entries go ahead of the trailing blank lines.
    fn push_entry(&mut self, key: &str, value: &str) {
        let pos = self
            .lines
            .iter()
            .rposition(|l| !l.is_blank())
            .map(|p| p + 1)
            .unwrap_or(0);
        self.lines
            .insert(pos, Line::Entry(key.to_string(), value.to_string()));
    }

    /// Remove every entry of `key`. Return whether anything was removed.
    pub fn unset(&mut self, key: &str) -> bool {
        let old_len = self.lines.len();
        self.lines.retain(|l| !l.is_key(key));
        old_len != self.lines.len()
    }

    /// Remove the `key=value` pair only.
    pub fn unset_value(&mut self, key: &str, value: &str) -> bool {
        let old_len = self.lines.len();
        self.lines.retain(
            |l| !matches!(l, Line::Entry(k, v) if k == key && v == value),
        );
        old_len != self.lines.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .collect()
    }

    /// Values of a space separated multi-value key like `DNS=`, across all
    /// entries of that key.
    pub fn get_words(&self, key: &str) -> Vec<String> {
        self.get_all(key)
            .into_iter()
            .flat_map(|v| v.split_whitespace())
            .map(|v| v.to_string())
            .collect()
    }

    fn render_into(&self, out: &mut Vec<String>) {
        match self.leading.as_ref() {
            Some(leading) => out.extend(leading.iter().cloned()),
            None => {
                if out.last().is_some_and(|l| !l.trim().is_empty()) {
                    out.push(String::new());
                }
            }
        }
        if !self.name.is_empty() {
            out.push(format!("[{}]", self.name));
        }
        for line in &self.lines {
            match line {
                Line::Entry(k, v) => out.push(format!("{k}={v}")),
                Line::Verbatim(l) => out.push(l.clone()),
            }
        }
    }
}

/// Ordered list of sections scoped to one target file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionBuilder {
    // Comment lines of a file holding no section yet
    head: Vec<String>,
    sections: Vec<Section>,
}

impl SectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse ini-style content. Comments (`#` and `;`) and blank lines are
    /// kept for rendering. Entries ahead of the first header are stored in a
    /// nameless section.
    ///
    /// Trivia lines before a header belong to that header starting from the
    /// first blank line, the ones above stay with the previous section.
    pub fn parse(content: &str) -> Result<Self, NcmError> {
        let mut ret = Self::new();
        let mut pending: Vec<String> = Vec::new();
        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if is_trivia(line) {
                pending.push(raw.trim_end().to_string());
                continue;
            }
            if let Some(name) =
                line.strip_prefix('[').and_then(|l| l.strip_suffix(']'))
            {
                let split = if ret.sections.is_empty() {
                    0
                } else {
                    pending
                        .iter()
                        .position(|l| l.trim().is_empty())
                        .unwrap_or(pending.len())
                };
                let leading = pending.split_off(split);
                ret.flush_trivia(&mut pending);
                let mut section = Section::new(name.trim());
                section.leading = Some(leading);
                ret.sections.push(section);
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(NcmError::new(
                    ErrorKind::InvalidInput,
                    format!(
                        "Line {} is neither section header nor key=value: \
                         {line}",
                        line_no + 1
                    ),
                ));
            };
            if ret.sections.is_empty() {
                let mut section = Section::new("");
                section.leading = Some(std::mem::take(&mut pending));
                ret.sections.push(section);
            }
            ret.flush_trivia(&mut pending);
            if let Some(section) = ret.sections.last_mut() {
                section.lines.push(Line::Entry(
                    key.trim().to_string(),
                    value.trim().to_string(),
                ));
            }
        }
        if ret.sections.is_empty() {
            ret.head = pending;
        } else {
            ret.flush_trivia(&mut pending);
        }
        Ok(ret)
    }

    fn flush_trivia(&mut self, pending: &mut Vec<String>) {
        if let Some(section) = self.sections.last_mut() {
            section
                .lines
                .extend(pending.drain(..).map(Line::Verbatim));
        }
    }

    /// Append a new section even if another one holds the same name.
    pub fn new_section(&mut self, name: &str) -> &mut Section {
        self.push(Section::new(name))
    }

    pub fn push(&mut self, section: Section) -> &mut Section {
        self.sections.push(section);
        let pos = self.sections.len() - 1;
        &mut self.sections[pos]
    }

    pub fn sections(&self) -> &[Section] {
        self.sections.as_slice()
    }

    /// First section named `name`.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// First section named `name`, appended when missing.
    pub fn section_or_insert(&mut self, name: &str) -> &mut Section {
        match self.sections.iter().position(|s| s.name == name) {
            Some(pos) => &mut self.sections[pos],
            None => self.new_section(name),
        }
    }

    pub fn sections_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections.iter().filter(move |s| s.name == name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.section_or_insert(section).set(key, value);
    }

    /// Remove `key` from the first section named `section`, dropping that
    /// section if nothing but blank lines is left.
    pub fn unset(&mut self, section: &str, key: &str) -> bool {
        let Some(pos) = self.sections.iter().position(|s| s.name == section)
        else {
            return false;
        };
        let removed = self.sections[pos].unset(key);
        if self.sections[pos].is_bare() {
            self.sections.remove(pos);
        }
        removed
    }

    /// Remove the `key=value` pair from every section named `section`.
    pub fn unset_value(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
    ) -> bool {
        let mut removed = false;
        for s in self.sections.iter_mut().filter(|s| s.name == section) {
            removed |= s.unset_value(key, value);
        }
        self.sections.retain(|s| !(s.name == section && s.is_bare()));
        removed
    }

    /// Remove every section named `name`. Return the number removed.
    pub fn remove_sections(&mut self, name: &str) -> usize {
        self.remove_sections_if(name, |_| true)
    }

    pub fn remove_sections_if<F>(&mut self, name: &str, mut matcher: F) -> usize
    where
        F: FnMut(&Section) -> bool,
    {
        let old_len = self.sections.len();
        self.sections.retain(|s| !(s.name == name && matcher(s)));
        old_len - self.sections.len()
    }

    /// Replace the first section of the same name accepted by `matcher`,
    /// append otherwise. A replaced section keeps the lines ahead of its
    /// header.
    pub fn replace_or_push<F>(&mut self, mut section: Section, matcher: F)
    where
        F: Fn(&Section) -> bool,
    {
        if let Some(existing) = self
            .sections
            .iter_mut()
            .find(|s| s.name == section.name && matcher(s))
        {
            section.leading = existing.leading.take();
            *existing = section;
        } else {
            self.sections.push(section);
        }
    }

    /// Deterministic rendering: parsed lines as they were, new sections
    /// appended after one blank line.
    pub fn render(&self) -> Vec<String> {
        let mut lines = self.head.clone();
        for section in self
            .sections
            .iter()
            .filter(|s| !(s.name.is_empty() && s.is_bare()))
        {
            section.render_into(&mut lines);
        }
        lines
    }
}

impl std::fmt::Display for SectionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.render() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_overrides_in_place() {
        let mut sb = SectionBuilder::new();
        sb.set("Network", "DHCP", "yes");
        sb.set("Network", "IPv6AcceptRA", "no");
        sb.set("Network", "DHCP", "ipv4");
        assert_eq!(
            sb.render(),
            vec!["[Network]", "DHCP=ipv4", "IPv6AcceptRA=no"]
        );
    }

    #[test]
    fn test_set_same_pair_twice_is_noop() {
        let mut once = SectionBuilder::new();
        once.set("Link", "MTUBytes", "1400");
        let mut twice = once.clone();
        twice.set("Link", "MTUBytes", "1400");
        assert_eq!(once.render(), twice.render());
    }

    #[test]
    fn test_multi_value_section_appends() {
        let mut sb = SectionBuilder::new();
        let section = sb.push(Section::new_multi_value("Network"));
        section.set("VLAN", "vlan10");
        section.set("VLAN", "vlan20");
        section.set("VLAN", "vlan10");
        assert_eq!(
            sb.render(),
            vec!["[Network]", "VLAN=vlan10", "VLAN=vlan20"]
        );
    }

    #[test]
    fn test_unset_drops_empty_section() {
        let mut sb = SectionBuilder::parse(
            "[Match]\nName=eth0\n\n[Network]\nDHCPServer=yes\n",
        )
        .unwrap();
        assert!(sb.unset("Network", "DHCPServer"));
        assert!(!sb.unset("Network", "DHCPServer"));
        assert_eq!(sb.to_string(), "[Match]\nName=eth0\n");
    }

    #[test]
    fn test_parse_render_keeps_duplicate_sections() {
        let content = "[Match]\nName=eth0\n\n[Address]\nAddress=192.0.2.1/24\n\n\
                       [Address]\nAddress=192.0.2.2/24\n";
        let sb = SectionBuilder::parse(content).unwrap();
        assert_eq!(sb.sections_named("Address").count(), 2);
        assert_eq!(sb.to_string(), content);
    }

    #[test]
    fn test_parse_nameless_section() {
        let sb = SectionBuilder::parse(
            "# comment\nPROXY_ENABLED=\"yes\"\nNO_PROXY=\"localhost\"\n",
        )
        .unwrap();
        assert_eq!(sb.get("", "PROXY_ENABLED"), Some("\"yes\""));
        assert_eq!(
            sb.render(),
            vec![
                "# comment",
                "PROXY_ENABLED=\"yes\"",
                "NO_PROXY=\"localhost\""
            ]
        );
    }

    #[test]
    fn test_parse_invalid_line() {
        let result = SectionBuilder::parse("[Match]\nName\n");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_get_words() {
        let sb =
            SectionBuilder::parse("[Network]\nDNS=192.0.2.1 192.0.2.2\nDNS=::1\n")
                .unwrap();
        assert_eq!(
            sb.section("Network").unwrap().get_words("DNS"),
            vec!["192.0.2.1", "192.0.2.2", "::1"]
        );
    }

    #[test]
    fn test_parse_render_keeps_comments() {
        let content = "# managed by admin\n[Match]\nName=eth0\n\n\
                       # static address\n[Address]\n; primary\n\
                       Address=192.0.2.1/24\n\n";
        let sb = SectionBuilder::parse(content).unwrap();
        assert_eq!(sb.to_string(), content);
    }

    #[test]
    fn test_new_section_after_comments() {
        let content = "# managed by admin\n[Match]\nName=eth0\n";
        let mut sb = SectionBuilder::parse(content).unwrap();
        sb.set("Network", "DHCP", "yes");
        assert_eq!(
            sb.to_string(),
            "# managed by admin\n[Match]\nName=eth0\n\n[Network]\nDHCP=yes\n"
        );
        assert!(sb.unset("Network", "DHCP"));
        assert_eq!(sb.to_string(), content);
    }

    #[test]
    fn test_commented_section_survives_unset() {
        let content = "# See resolved.conf(5)\n[Resolve]\n#DNS=\n#FallbackDNS=\n";
        let mut sb = SectionBuilder::parse(content).unwrap();
        sb.set("Resolve", "DNS", "192.0.2.53");
        assert_eq!(
            sb.to_string(),
            "# See resolved.conf(5)\n[Resolve]\n#DNS=\n#FallbackDNS=\n\
             DNS=192.0.2.53\n"
        );
        assert!(sb.unset("Resolve", "DNS"));
        assert_eq!(sb.to_string(), content);
    }

    #[test]
    fn test_comment_only_file() {
        let mut sb = SectionBuilder::parse("# empty\n").unwrap();
        sb.set("Time", "NTP", "ntp.example.org");
        assert_eq!(
            sb.to_string(),
            "# empty\n\n[Time]\nNTP=ntp.example.org\n"
        );
        sb.unset("Time", "NTP");
        assert_eq!(sb.to_string(), "# empty\n");
    }
}
