// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Out-of-process end-to-end tests: each file under `gc_tests/tests/` is a
//! whole Rust program, compiled against this crate and run as a separate
//! process, with its expected behavior declared in a `// Run-time:` header
//! comment. A real process is required here (rather than `#[test]`
//! functions in-process) because these tests exercise stack-root scanning,
//! which only makes sense with a real, single program stack captured from
//! `main`.

use lang_tester::LangTester;
use std::{env, fs::read_to_string, path::PathBuf, process::Command};
use tempdir::TempDir;

fn main() {
    let tempdir = TempDir::new("gcmalloc_lang_tests").unwrap();
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    let target_dir = manifest_dir.join("target").join(profile);
    let deps_dir = target_dir.join("deps");

    LangTester::new()
        .test_dir("gc_tests/tests")
        .test_file_filter(|p| p.extension().map_or(false, |e| e == "rs"))
        .test_extract(|p| {
            read_to_string(p)
                .unwrap()
                .lines()
                .take_while(|l| l.starts_with("//"))
                .map(|l| l[2..].trim_start_matches(' ').to_string())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .test_cmds(move |p| {
            let mut exe = PathBuf::new();
            exe.push(&tempdir);
            exe.push(p.file_stem().unwrap());

            let mut compiler = Command::new(env::var("RUSTC").unwrap_or_else(|_| "rustc".into()));
            compiler.args(&[
                "--edition",
                "2018",
                "-o",
                exe.to_str().unwrap(),
                p.to_str().unwrap(),
                "-L",
                deps_dir.to_str().unwrap(),
                "--extern",
                &format!("gcmalloc={}", rlib_path(&target_dir)),
            ]);

            let runtime = Command::new(&exe);
            vec![("Compiler", compiler), ("Run-time", runtime)]
        })
        .run();
}

fn rlib_path(target_dir: &PathBuf) -> String {
    target_dir
        .join("libgcmalloc.rlib")
        .to_str()
        .unwrap()
        .to_string()
}
