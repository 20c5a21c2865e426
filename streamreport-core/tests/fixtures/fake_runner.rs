// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A fake test runner for integration tests: replays one of several canned
//! JSONL scripts to stdout instead of actually compiling and running Go (or
//! any other language's) tests. Selected via the `FAKE_RUNNER_SCENARIO`
//! environment variable, standing in for a real subprocess so the harness
//! can drive a known, reproducible stream.

use std::env;
use std::io::{self, Write};
use std::process::exit;
use std::thread::sleep;
use std::time::Duration;

fn main() {
    let scenario = env::var("FAKE_RUNNER_SCENARIO").unwrap_or_else(|_| "clean_pass".to_string());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match scenario.as_str() {
        "clean_pass" => {
            emit(
                &mut out,
                &[
                    r#"{"Action":"start","Package":"example.com/pkg"}"#,
                    r#"{"Action":"run","Package":"example.com/pkg","Test":"TestOne"}"#,
                    r#"{"Action":"output","Package":"example.com/pkg","Test":"TestOne","Output":"=== RUN   TestOne\n"}"#,
                    r#"{"Action":"pass","Package":"example.com/pkg","Test":"TestOne","Elapsed":0.01}"#,
                    r#"{"Action":"output","Package":"example.com/pkg","Output":"coverage: 91.2% of statements\n"}"#,
                    r#"{"Action":"pass","Package":"example.com/pkg","Elapsed":0.02}"#,
                ],
            );
            exit(0);
        }
        "build_failure" => {
            emit(
                &mut out,
                &[
                    r#"{"Action":"start","Package":"example.com/broken"}"#,
                    r#"{"Action":"output","Package":"example.com/broken","Output":"./broken.go:12:2: undefined: Frobnicate\n"}"#,
                    r#"{"Action":"output","Package":"example.com/broken","Output":"FAIL\texample.com/broken [build failed]\n"}"#,
                    r#"{"Action":"fail","Package":"example.com/broken","Elapsed":0}"#,
                ],
            );
            exit(1);
        }
        "subtest_failure" => {
            emit(
                &mut out,
                &[
                    r#"{"Action":"run","Package":"example.com/pkg","Test":"TestGroup"}"#,
                    r#"{"Action":"run","Package":"example.com/pkg","Test":"TestGroup/ok"}"#,
                    r#"{"Action":"run","Package":"example.com/pkg","Test":"TestGroup/broken"}"#,
                    r#"{"Action":"pass","Package":"example.com/pkg","Test":"TestGroup/ok","Elapsed":0.01}"#,
                    r#"{"Action":"output","Package":"example.com/pkg","Test":"TestGroup/broken","Output":"assertion failed: got 1, want 2\n"}"#,
                    r#"{"Action":"fail","Package":"example.com/pkg","Test":"TestGroup/broken","Elapsed":0.01}"#,
                    r#"{"Action":"fail","Package":"example.com/pkg","Test":"TestGroup","Elapsed":0.02}"#,
                    r#"{"Action":"fail","Package":"example.com/pkg","Elapsed":0.02}"#,
                ],
            );
            exit(1);
        }
        "skip_with_reason" => {
            emit(
                &mut out,
                &[
                    r#"{"Action":"start","Package":"example.com/pkg"}"#,
                    r#"{"Action":"run","Package":"example.com/pkg","Test":"TestSkipped"}"#,
                    r#"{"Action":"output","Package":"example.com/pkg","Test":"TestSkipped","Output":"    pkg_test.go:42: skipping: requires network access\n"}"#,
                    r#"{"Action":"skip","Package":"example.com/pkg","Test":"TestSkipped","Elapsed":0}"#,
                    r#"{"Action":"pass","Package":"example.com/pkg","Elapsed":0}"#,
                ],
            );
            exit(0);
        }
        "ci_mode_exit1_no_failures" => {
            emit(
                &mut out,
                &[
                    r#"{"Action":"start","Package":"example.com/pkg"}"#,
                    r#"{"Action":"run","Package":"example.com/pkg","Test":"TestOne"}"#,
                    r#"{"Action":"pass","Package":"example.com/pkg","Test":"TestOne","Elapsed":0.01}"#,
                    r#"{"Action":"pass","Package":"example.com/pkg","Elapsed":0.01}"#,
                ],
            );
            // Simulates a `TestMain` that doesn't propagate `m.Run()`'s
            // return code faithfully; all tests passed but the process
            // still exits 1.
            exit(1);
        }
        "interrupt" => {
            emit(
                &mut out,
                &[
                    r#"{"Action":"start","Package":"example.com/slow"}"#,
                    r#"{"Action":"run","Package":"example.com/slow","Test":"TestSlow"}"#,
                ],
            );
            // No custom signal handler: the default disposition for
            // SIGTERM/SIGKILL terminates the process, which is exactly
            // what the supervisor's interrupt path expects to observe.
            sleep(Duration::from_secs(30));
            exit(0);
        }
        other => {
            eprintln!("unknown FAKE_RUNNER_SCENARIO: {other}");
            exit(2);
        }
    }
}

fn emit(out: &mut impl Write, lines: &[&str]) {
    for line in lines {
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}
