// src/main.rs
use std::env;
use std::fs;
use std::process::ExitCode;

use curlog::parser::{self, Item};
use curlog::{Context, GoalResult};

/// Test-harness driver: consults a source file and runs every `??--`
/// goal in it, reporting one line per goal. `REPORT_ONLY_FAILURES=1`
/// suppresses the "ok" lines.
fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: curlog <file>");
        return ExitCode::from(2);
    }
    let filename = &args[1];
    let source = match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{}: {}", filename, error);
            return ExitCode::from(2);
        }
    };
    let report_only_failures =
        env::var("REPORT_ONLY_FAILURES").map(|v| v == "1").unwrap_or(false);

    let mut ctx = Context::new();
    let items = match parser::parse_program(&mut ctx, &source) {
        Ok(items) => items,
        Err(error) => {
            eprintln!("{}: {}", filename, error);
            return ExitCode::from(2);
        }
    };

    let mut failures = 0u32;
    let mut goal_index = 0u32;
    for item in items {
        match item {
            Item::Clause { head, body } => {
                let text = ctx.print_string(head);
                if let Err(error) = ctx.install_clause(head, body) {
                    eprintln!("error installing {}: {}", text, error);
                    failures += 1;
                }
            }
            Item::Directive(goal) => {
                if let Ok(GoalResult::Error(error)) = ctx.execute_goal(goal) {
                    eprintln!("directive error: {}", ctx.print_string(error));
                    failures += 1;
                }
            }
            Item::TestGoal(goal) => {
                goal_index += 1;
                let label = ctx.print_string(goal);
                match ctx.execute_goal(goal) {
                    Ok(GoalResult::True) => {
                        if !report_only_failures {
                            println!("ok {}: {}", goal_index, label);
                        }
                    }
                    Ok(GoalResult::Fail) => {
                        println!("FAIL {}: {}", goal_index, label);
                        failures += 1;
                    }
                    Ok(GoalResult::Error(error)) => {
                        println!("ERROR {}: {}: {}", goal_index, label, ctx.print_string(error));
                        failures += 1;
                    }
                    Ok(GoalResult::Halt(code)) => {
                        println!("halt({}) at goal {}", code, goal_index);
                        return ExitCode::from(code.clamp(0, 255) as u8);
                    }
                    Err(error) => {
                        println!("ENGINE ERROR {}: {}", goal_index, error);
                        failures += 1;
                    }
                }
            }
        }
    }
    if failures > 0 {
        println!("{} failure(s)", failures);
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
