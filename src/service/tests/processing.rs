use super::*;

#[tokio::test]
async fn mixed_batch_isolates_the_unsupported_file() {
    let converter = Arc::new(
        ScriptedConverter::new()
            .script(
                "a.pdf",
                Script::Pages(vec!["first page".into(), "second page".into()]),
            )
            .script("b.png", Script::Text("image text".into())),
    );
    let (service, _tmp) = create_test_service(converter.clone()).await;

    let job = run_batch(&service, &["a.pdf", "b.png", "c.xyz"]).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        (job.total, job.processed, job.successful, job.failed),
        (3, 3, 2, 1)
    );
    assert_eq!(job.errors.len(), 1);
    assert!(job.errors[0].contains("c.xyz"));
    assert_eq!(job.errors[0], "c.xyz: unsupported file type: .xyz");

    // The unsupported file never reached the converter
    let called: Vec<String> = converter.calls().into_iter().map(|(f, _)| f).collect();
    assert_eq!(called, vec!["a.pdf", "b.png"]);

    let entries = read_archive(job.archive_path.as_ref().unwrap());
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a.md", "b.md"]);

    let a_md = &entries[0].1;
    assert_eq!(a_md.matches("## Page ").count(), 2);
    assert_eq!(a_md.matches(PAGE_SPLIT_MARKER).count(), 1);
    assert!(a_md.find("## Page 1").unwrap() < a_md.find("## Page 2").unwrap());
    assert_eq!(entries[1].1, "image text");
}

#[tokio::test]
async fn converter_failure_fails_only_that_file() {
    let converter = Arc::new(
        ScriptedConverter::new().script("bad.png", Script::Fail("CUDA out of memory".into())),
    );
    let (service, _tmp) = create_test_service(converter).await;

    let job = run_batch(&service, &["good.png", "bad.png", "later.jpg"]).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!((job.successful, job.failed), (2, 1));
    assert_eq!(
        job.errors,
        vec!["bad.png: service returned status 500: CUDA out of memory".to_string()]
    );

    let names: Vec<String> = read_archive(job.archive_path.as_ref().unwrap())
        .into_iter()
        .map(|(n, _)| n)
        .collect();
    assert_eq!(names, vec!["good.md", "later.md"]);
}

#[tokio::test]
async fn all_failures_still_complete_with_empty_archive() {
    let converter = Arc::new(ScriptedConverter::new());
    let (service, _tmp) = create_test_service(converter).await;

    let job = run_batch(&service, &["x.doc", "y.txt"]).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!((job.processed, job.successful, job.failed), (2, 0, 2));
    assert!(job.fatal_error.is_none());
    assert!(read_archive(job.archive_path.as_ref().unwrap()).is_empty());
}

#[tokio::test]
async fn slow_conversion_times_out_per_file() {
    let converter = Arc::new(
        ScriptedConverter::new().script("slow.png", Script::Delay(Duration::from_secs(30))),
    );
    let (service, _tmp) = create_test_service_with(converter, |config| {
        config.processing.conversion_timeout = Duration::from_millis(50);
    })
    .await;

    let job = run_batch(&service, &["slow.png", "fast.png"]).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!((job.successful, job.failed), (1, 1));
    assert!(job.errors[0].starts_with("slow.png: conversion timed out"));
}

#[tokio::test]
async fn converter_panic_fails_only_that_file() {
    let converter =
        Arc::new(ScriptedConverter::new().script("bad.png", Script::Panic("decoder blew up")));
    let (service, _tmp) = create_test_service(converter).await;

    let job = run_batch(&service, &["bad.png", "good.png"]).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!((job.processed, job.successful, job.failed), (2, 1, 1));
    assert_eq!(
        job.errors,
        vec!["bad.png: converter panicked: decoder blew up".to_string()]
    );
    let names: Vec<String> = read_archive(job.archive_path.as_ref().unwrap())
        .into_iter()
        .map(|(n, _)| n)
        .collect();
    assert_eq!(names, vec!["good.md"]);
}

#[tokio::test]
async fn abandoned_job_is_failed_once() {
    let (service, _tmp) = create_test_service(Arc::new(ScriptedConverter::new())).await;
    let mut events = service.subscribe();
    let id = service.registry.create(2).await;
    service.registry.start(&id).await.unwrap();

    let job = service
        .abandon(&id, "job error: lost track of job".into())
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.fatal_error.as_deref(), Some("job error: lost track of job"));
    assert!(matches!(
        events.try_recv().unwrap(),
        crate::types::Event::JobFailed { .. }
    ));

    // A terminal job keeps its first failure
    let again = service.abandon(&id, "second reason".into()).await.unwrap();
    assert_eq!(again.fatal_error.as_deref(), Some("job error: lost track of job"));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn packaging_failure_fails_the_job() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let converter = Arc::new(ScriptedConverter::gated(gate.clone()));
    let (service, _tmp) = create_test_service(converter).await;

    // A directory squatting on the archive's temporary path makes packaging fail
    let submitted = service.submit(vec![upload("a.png")], None).await.unwrap();
    let part = service
        .config
        .results_dir()
        .join(format!("{}.zip.part", submitted.job_id));
    std::fs::create_dir_all(part.join("blocker")).unwrap();
    gate.add_permits(1);

    let job = submitted.handle.wait().await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.archive_path.is_none());
    assert!(job.completed_at.is_some());
    let fatal = job.fatal_error.unwrap();
    assert!(fatal.contains("packaging failed"), "{fatal}");
    // Per-file progress recorded before packaging is preserved
    assert_eq!((job.processed, job.successful), (1, 1));
}

#[tokio::test]
async fn prompt_override_wins_over_default() {
    let converter = Arc::new(ScriptedConverter::new());
    let (service, _tmp) = create_test_service(converter.clone()).await;

    let submitted = service
        .submit(vec![upload("a.png")], Some("Free OCR.".into()))
        .await
        .unwrap();
    submitted.handle.wait().await.unwrap();

    let default_job = run_batch(&service, &["b.png"]).await;
    assert_eq!(default_job.status, JobStatus::Completed);

    let calls = converter.calls();
    assert_eq!(calls[0], ("a.png".to_string(), "Free OCR.".to_string()));
    assert_eq!(calls[1].1, crate::config::DEFAULT_PROMPT);
}

#[tokio::test]
async fn blank_prompt_falls_back_to_default() {
    let converter = Arc::new(ScriptedConverter::new());
    let (service, _tmp) = create_test_service(converter.clone()).await;

    let submitted = service
        .submit(vec![upload("a.png")], Some("   ".into()))
        .await
        .unwrap();
    submitted.handle.wait().await.unwrap();

    assert_eq!(converter.calls()[0].1, crate::config::DEFAULT_PROMPT);
}

#[tokio::test]
async fn colliding_stems_get_distinct_outputs() {
    let converter = Arc::new(ScriptedConverter::new());
    let (service, _tmp) = create_test_service(converter).await;

    let job = run_batch(&service, &["a.pdf", "a.png"]).await;

    let entries = read_archive(job.archive_path.as_ref().unwrap());
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a (1).md", "a.md"]);
    assert!(entries[1].1.contains("page 1 of a.pdf"));
    assert_eq!(entries[0].1, "text of a.png");
}

#[tokio::test]
async fn empty_converter_output_is_kept() {
    let converter = Arc::new(ScriptedConverter::new().script("blank.png", Script::Text(String::new())));
    let (service, _tmp) = create_test_service(converter).await;

    let job = run_batch(&service, &["blank.png"]).await;

    assert_eq!(job.successful, 1);
    let entries = read_archive(job.archive_path.as_ref().unwrap());
    assert_eq!(entries, vec![("blank.md".to_string(), String::new())]);
}

#[tokio::test]
async fn events_follow_the_job_lifecycle() {
    let converter = Arc::new(ScriptedConverter::new());
    let (service, _tmp) = create_test_service(converter).await;
    let mut events = service.subscribe();

    let job = run_batch(&service, &["a.png", "c.xyz"]).await;
    let id = job.id.clone();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert_eq!(
        received,
        vec![
            Event::JobQueued {
                id: id.clone(),
                total: 2
            },
            Event::JobStarted { id: id.clone() },
            Event::FileProcessed {
                id: id.clone(),
                filename: "a.png".into(),
                succeeded: true,
                processed: 1,
                total: 2,
            },
            Event::FileProcessed {
                id: id.clone(),
                filename: "c.xyz".into(),
                succeeded: false,
                processed: 2,
                total: 2,
            },
            Event::JobCompleted {
                id,
                successful: 1,
                failed: 1
            },
        ]
    );
}

#[tokio::test]
async fn progress_is_monotonic_while_polling() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let converter = Arc::new(ScriptedConverter::gated(gate.clone()));
    let (service, _tmp) = create_test_service(converter).await;

    let names = ["1.png", "2.png", "3.png", "4.png"];
    let submitted = service
        .submit(names.iter().map(|n| upload(n)).collect(), None)
        .await
        .unwrap();
    let id = submitted.job_id.clone();

    let mut last_processed = 0;
    for _ in 0..names.len() {
        gate.add_permits(1);
        for _ in 0..20 {
            let status = service.status(&id).await.unwrap();
            assert!(status.processed >= last_processed);
            assert!(status.processed <= status.total);
            assert!(status.successful + status.failed <= status.processed);
            last_processed = status.processed;
            tokio::task::yield_now().await;
        }
    }

    let job = submitted.handle.wait().await.unwrap();
    assert_eq!(job.processed, 4);
    assert_eq!(job.successful + job.failed, job.total);
}
