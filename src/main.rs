extern crate crossbeam_channel as channel;

mod cli;
mod config;
mod fragments;
mod graphql;
mod work;
mod worker_pool;

use cli::{print_messages, PrintableMessage, RuntimeConfig};
use config::{GraphQLConfig, ProjectPlan};
use worker_pool::WorkerPool;

fn run(runtime_config: &RuntimeConfig) -> Vec<PrintableMessage> {
    let loaded = GraphQLConfig::resolve_path(runtime_config.config_file_path())
        .and_then(|path| GraphQLConfig::from_path(&path));
    let mut config = match loaded {
        Ok(config) => config,
        Err(message) => return vec![message],
    };
    let project_names = match config.select_projects(runtime_config) {
        Ok(names) => names,
        Err(message) => return vec![message],
    };

    let mut messages = Vec::new();
    let mut jobs = Vec::new();
    for name in &project_names {
        match config.plan_project(name, runtime_config) {
            Ok(ProjectPlan::Compile(job)) => jobs.push(job),
            Ok(ProjectPlan::Skip) => {
                if runtime_config.is_verbose() {
                    messages.push(PrintableMessage::new_info(&format!(
                        "Generate Fragments not configured for project `{name}`. Skipping"
                    )));
                }
            }
            Err(mut message) => {
                message.with_help_text(&format!("while preparing project `{name}`"));
                messages.push(message);
            }
        }
    }

    let reports = WorkerPool::new(usize::from(runtime_config.thread_count())).run(jobs);
    let mut written = Vec::new();
    for report in reports {
        match report.result {
            Ok(output) => {
                if output.fragment_count == 0 {
                    messages.push(PrintableMessage::new_warning(&format!(
                        "schema of project `{}` has no object types to generate fragments for",
                        report.project_name
                    )));
                }
                messages.push(PrintableMessage::new_success(&format!(
                    "Fragments for project `{}` written to `{}`",
                    report.project_name,
                    report.output_path.display()
                )));
                config.apply_settings(&report.project_name, &output.settings);
                written.push(report.project_name);
            }
            Err(errors) => messages.extend(errors),
        }
    }

    if runtime_config.should_save() && !written.is_empty() {
        match config.save() {
            Ok(()) => messages.extend(written.iter().map(|name| {
                PrintableMessage::new_success(&format!(
                    "Configuration for project `{name}` saved to `{}`",
                    config.file_path().display()
                ))
            })),
            Err(message) => messages.push(message),
        }
    } else if runtime_config.should_save() {
        messages.push(PrintableMessage::new_warning(
            "no project compiled successfully, configuration not saved",
        ));
    }
    messages
}

fn main() {
    let runtime_config = RuntimeConfig::from_cli();
    let messages = run(&runtime_config);
    if print_messages(&messages) {
        std::process::exit(1);
    }
}
