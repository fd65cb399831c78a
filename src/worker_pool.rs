use crate::cli::PrintableMessage;
use crate::work::{Job, JobReport};
use std::thread;

/// Runs independent project compiles across a fixed number of threads.
pub struct WorkerPool {
    num_workers: usize,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> WorkerPool {
        WorkerPool {
            num_workers: num_workers.max(1),
        }
    }

    /// Reports come back in the order the jobs were given.
    pub fn run(&self, jobs: Vec<Job>) -> Vec<JobReport> {
        if jobs.is_empty() {
            return Vec::new();
        }
        let placeholders = jobs
            .iter()
            .map(|job| (job.project_name.clone(), job.output_path.clone()))
            .collect::<Vec<_>>();
        let threads = self.num_workers.min(jobs.len());
        let (job_tx, job_rx) = channel::unbounded::<(usize, Job)>();
        let (report_tx, report_rx) = channel::unbounded::<(usize, JobReport)>();
        for indexed_job in jobs.into_iter().enumerate() {
            if job_tx.send(indexed_job).is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            let job_rx = job_rx.clone();
            let report_tx = report_tx.clone();
            handles.push(thread::spawn(move || {
                for (index, job) in job_rx.iter() {
                    if report_tx.send((index, job.run())).is_err() {
                        return;
                    }
                }
            }));
        }
        drop(job_rx);
        drop(report_tx);
        for handle in handles {
            // A panicked worker loses only its current job; it is reported below.
            let _ = handle.join();
        }

        let mut finished = placeholders.iter().map(|_| None).collect::<Vec<_>>();
        for (index, report) in report_rx.iter() {
            finished[index] = Some(report);
        }
        placeholders
            .into_iter()
            .zip(finished)
            .map(|((project_name, output_path), report)| {
                report.unwrap_or_else(|| {
                    let message = PrintableMessage::new_simple_program_error(&format!(
                        "compiling project `{project_name}` stopped unexpectedly"
                    ));
                    JobReport {
                        project_name,
                        output_path,
                        result: Err(vec![message]),
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorSettings;
    use crate::fragments::Dialect;
    use std::path::PathBuf;

    fn failing_job(name: &str) -> Job {
        Job {
            project_name: name.to_string(),
            schema_path: PathBuf::from(format!("missing/{name}.graphql")),
            output_path: PathBuf::from(format!("missing/{name}.fragments.graphql")),
            dialect: Dialect::GraphQL,
            settings: GeneratorSettings {
                output: String::new(),
                generator: "graphql".to_string(),
            },
        }
    }

    #[test]
    fn reports_keep_submission_order() {
        let names = ["a", "b", "c", "d", "e"];
        let jobs = names.iter().map(|name| failing_job(name)).collect();
        let reports = WorkerPool::new(3).run(jobs);
        assert_eq!(
            reports
                .iter()
                .map(|report| report.project_name.as_str())
                .collect::<Vec<_>>(),
            names
        );
        assert!(reports.iter().all(|report| report.result.is_err()));
    }

    #[test]
    fn no_jobs_no_reports() {
        assert!(WorkerPool::new(2).run(Vec::new()).is_empty());
    }
}
