#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use assert_cmd::assert::Assert;
use opa_domain::{InstalledAppEntry, Registry};
use serde_json::Value;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const APPID: &str = "com.example.app";

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn manifest_xml(
    appid: &str,
    appname: &str,
    appversion: &str,
    minversion: &str,
    platforms: &[&str],
) -> String {
    let platforms: String = platforms
        .iter()
        .map(|platform| format!("    <platform>{platform}</platform>\n"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Package>
  <Application>
    <appname>{appname}</appname>
    <appid>{appid}</appid>
    <appversion>{appversion}</appversion>
    <appstatus>release</appstatus>
    <minversion>{minversion}</minversion>
  </Application>
  <Build>
{platforms}  </Build>
  <Privacy>
    <pressmission>network</pressmission>
    <pressmission>storage</pressmission>
  </Privacy>
</Package>
"#
    )
}

/// Builds a package archive in memory and writes it to `path`.
pub struct Package {
    entries: Vec<(String, Vec<u8>, u32)>,
}

impl Package {
    pub fn new(manifest: &str) -> Self {
        Self {
            entries: vec![("Manifest.xml".to_string(), manifest.as_bytes().to_vec(), 0o644)],
        }
    }

    pub fn binary(mut self, platform: &str, script: &str) -> Self {
        self.entries.push((
            format!("bin/{platform}/main"),
            script.as_bytes().to_vec(),
            0o755,
        ));
        self
    }

    pub fn icon(mut self) -> Self {
        self.entries
            .push(("res/AppIcon.png".to_string(), b"\x89PNG icon".to_vec(), 0o644));
        self
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents, mode) in &self.entries {
            writer
                .start_file(name.as_str(), FileOptions::default().unix_permissions(*mode))
                .expect("start entry");
            writer.write_all(contents).expect("write entry");
        }
        let bytes = writer.finish().expect("finish archive").into_inner();
        std::fs::write(path, bytes).expect("write archive");
        path.to_path_buf()
    }
}

/// Standard single-platform package used across the CLI tests.
pub fn demo_package(dir: &Path, platforms: &[&str], present: &[&str]) -> PathBuf {
    let mut package = Package::new(&manifest_xml(APPID, "Example", "1.0", "1.0", platforms)).icon();
    for platform in present {
        package = package.binary(platform, &format!("#!/bin/sh\necho {platform}\n"));
    }
    package.write(&dir.join("demo.opa"))
}

pub fn registry_entries(apps_dir: &Path) -> Vec<InstalledAppEntry> {
    let path = apps_dir.join("installed_apps.xml");
    if !path.exists() {
        return Vec::new();
    }
    let contents = std::fs::read_to_string(path).expect("read registry");
    Registry::decode(&contents)
        .expect("decode registry")
        .entries()
        .to_vec()
}
