use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::WatchEvent;
use super::debouncer::{ChangeKind, Debouncer, is_ignored};
use super::router::{Action, classify, execute, handle};
use crate::builder::{Task, TaskKind, TaskOptions, TaskSlots};
use crate::config::ImageStrategy;
use crate::core::{BuildContext, BuildMode};
use crate::reload::LiveEvent;
use crate::tasks::{script, style, template};
use crate::testing::{Recorder, TestSite, failing_task};

fn make_event(paths: Vec<&PathBuf>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().cloned().collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

// ============================================================================
// debouncer
// ============================================================================

#[test]
fn test_debouncer_empty() {
    let mut debouncer = Debouncer::new();
    assert!(debouncer.take_ready().is_empty());
    assert!(debouncer.sleep_duration() >= Duration::from_secs(60));
}

#[test]
fn test_debouncer_coalescing() {
    let site = TestSite::new();
    let a = site.src("a.tpl", "a");
    let b = site.src("b.tpl", "b");
    let c = site.paths.src.join("c.tpl");
    let mut debouncer = Debouncer::new();

    // removed then restored → created
    debouncer.add_event(&make_event(vec![&a], remove_kind()));
    debouncer.add_event(&make_event(vec![&a], create_kind()));
    // modified then removed → removed
    debouncer.add_event(&make_event(vec![&b], modify_kind()));
    debouncer.add_event(&make_event(vec![&b], remove_kind()));
    // created then removed → nothing
    debouncer.add_event(&make_event(vec![&c], create_kind()));
    debouncer.add_event(&make_event(vec![&c], remove_kind()));

    assert_eq!(debouncer.changes.len(), 2);
    assert_eq!(debouncer.changes[&a].kind, ChangeKind::Created);
    assert_eq!(debouncer.changes[&b].kind, ChangeKind::Removed);
}

#[test]
fn test_debouncer_ignores_metadata_and_temp_files() {
    let site = TestSite::new();
    let page = site.src("a.tpl", "a");
    let swap = site.src(".a.tpl.swp", "");
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(
        vec![&page],
        notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
            notify::event::MetadataKind::Any,
        )),
    ));
    debouncer.add_event(&make_event(vec![&swap], modify_kind()));
    assert!(debouncer.changes.is_empty());
}

#[test]
fn test_debouncer_waits_for_window() {
    let site = TestSite::new();
    let page = site.src("a.tpl", "a");
    let mut debouncer = Debouncer::with_window(Duration::from_millis(50));

    debouncer.add_event(&make_event(vec![&page], modify_kind()));
    assert!(debouncer.take_ready().is_empty());

    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(debouncer.take_ready(), vec![WatchEvent::Modified(page)]);
    assert!(debouncer.changes.is_empty());
}

#[test]
fn test_debouncer_holds_growing_file() {
    let site = TestSite::new();
    let page = site.src("a.tpl", "a");
    let mut debouncer = Debouncer::with_window(Duration::from_millis(50));

    debouncer.add_event(&make_event(vec![&page], create_kind()));
    fs::write(&page, "a longer body").unwrap();
    std::thread::sleep(Duration::from_millis(80));

    // Size changed since the event: window restarts
    assert!(debouncer.take_ready().is_empty());
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(debouncer.take_ready(), vec![WatchEvent::Added(page)]);
}

#[test]
fn test_debouncer_removal_is_immediate_after_window() {
    let site = TestSite::new();
    let gone = site.paths.src.join("gone.css");
    let mut debouncer = Debouncer::with_window(Duration::ZERO);

    debouncer.add_event(&make_event(vec![&gone], remove_kind()));
    assert_eq!(debouncer.take_ready(), vec![WatchEvent::Removed(gone)]);
}

#[test]
fn test_is_ignored() {
    assert!(is_ignored(&PathBuf::from("/s/src/.DS_Store")));
    assert!(is_ignored(&PathBuf::from("/s/src/index.tpl~")));
    assert!(is_ignored(&PathBuf::from("/s/node_modules/x/index.js")));
    assert!(is_ignored(&PathBuf::from("/s/.git/HEAD")));
    assert!(!is_ignored(&PathBuf::from("/s/src/index.tpl")));
}

// ============================================================================
// classification
// ============================================================================

fn dev_context(site: &TestSite, tasks: TaskSlots) -> Arc<BuildContext> {
    site.context(BuildMode::Development, tasks)
}

#[test]
fn test_template_edit_includes_dependents() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    let nav = site.paths.src.join("_nav.tpl");
    let layout = site.paths.src.join("_layout.tpl");
    let index = site.paths.src.join("index.tpl");
    {
        let mut graph = ctx.graph.write();
        graph.add_dependency(&index, &layout);
        graph.add_dependency(&layout, &nav);
    }

    let action = classify(&WatchEvent::Modified(nav.clone()), &ctx);
    let Action::Rebuild {
        task,
        files,
        invalidate,
        notify,
    } = action
    else {
        panic!("expected rebuild, got {action:?}");
    };
    assert_eq!(task, TaskKind::Template);
    assert_eq!(files, Some(vec![nav.clone(), layout.clone(), index.clone()]));
    assert_eq!(invalidate, vec![nav, layout, index]);
    assert_eq!(notify, Some(LiveEvent::Reload));
}

#[test]
fn test_template_removal() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    let page = site.paths.src.join("about/index.tpl");
    let nav = site.paths.src.join("_nav.tpl");

    assert_eq!(
        classify(&WatchEvent::Removed(page.clone()), &ctx),
        Action::Remove {
            source: page,
            artifact: Some(site.dist("about/index.html")),
            clear_deps: true,
            notify: Some(LiveEvent::Reload),
        }
    );
    assert_eq!(
        classify(&WatchEvent::Removed(nav.clone()), &ctx),
        Action::Remove {
            source: nav,
            artifact: None,
            clear_deps: true,
            notify: None,
        }
    );
}

#[test]
fn test_style_and_script_rebuild_whole_task() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());

    let style = classify(&WatchEvent::Modified(site.paths.src.join("css/_vars.css")), &ctx);
    assert!(matches!(
        style,
        Action::Rebuild { task: TaskKind::Style, files: None, notify: Some(LiveEvent::CssUpdate), .. }
    ));

    let script = classify(&WatchEvent::Added(site.paths.src.join("js/app.ts")), &ctx);
    assert!(matches!(
        script,
        Action::Rebuild { task: TaskKind::Script, files: None, notify: Some(LiveEvent::Reload), .. }
    ));
}

#[test]
fn test_partial_style_removal_is_ignored() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    let vars = site.paths.src.join("css/_vars.css");
    assert_eq!(classify(&WatchEvent::Removed(vars), &ctx), Action::Ignore);
}

#[test]
fn test_raster_removal_uses_active_strategy() {
    let site = TestSite::new();
    let hero = site.paths.src.join("images/hero.jpg");

    for (strategy, artifact) in [
        (ImageStrategy::Webp, "images/hero.webp"),
        (ImageStrategy::Avif, "images/hero.avif"),
        (ImageStrategy::None, "images/hero.jpg"),
    ] {
        let mut config = site.config.clone();
        config.build.image_optimization = strategy;
        let ctx = BuildContext::new(config, BuildMode::Development, TaskSlots::default());

        let Action::Remove { artifact: Some(path), .. } = classify(&WatchEvent::Removed(hero.clone()), &ctx)
        else {
            panic!("expected removal");
        };
        assert_eq!(path, site.dist(artifact));
    }
}

#[test]
fn test_raster_and_vector_edits_are_scoped() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    let hero = site.paths.src.join("hero.png");
    let logo = site.paths.src.join("logo.svg");

    assert_eq!(
        classify(&WatchEvent::Modified(hero.clone()), &ctx),
        Action::Rebuild {
            task: TaskKind::Image,
            files: Some(vec![hero]),
            invalidate: Vec::new(),
            notify: Some(LiveEvent::Reload),
        }
    );
    assert!(matches!(
        classify(&WatchEvent::Added(logo), &ctx),
        Action::Rebuild { task: TaskKind::Vector, .. }
    ));
}

#[test]
fn test_icons_never_reach_vector_task() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    let home = site.src("ui/icons/home.svg", "<svg/>");
    site.src("ui/icons/menu.svg", "<svg/>");

    for event in [WatchEvent::Added(home.clone()), WatchEvent::Modified(home.clone())] {
        assert!(matches!(
            classify(&event, &ctx),
            Action::Rebuild { task: TaskKind::Sprite, .. }
        ));
    }

    // Other icons remain: the sprite is rebuilt, not deleted
    fs::remove_file(&home).unwrap();
    assert!(matches!(
        classify(&WatchEvent::Removed(home), &ctx),
        Action::Rebuild { task: TaskKind::Sprite, .. }
    ));
}

#[test]
fn test_last_icon_removal_deletes_sprite() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    let home = site.paths.src.join("icons/home.svg");
    fs::create_dir_all(home.parent().unwrap()).unwrap();

    let Action::Remove { artifact, .. } = classify(&WatchEvent::Removed(home), &ctx) else {
        panic!("expected removal");
    };
    assert_eq!(artifact, Some(site.dist("icons.svg")));
}

#[test]
fn test_static_files() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    let robots = site.paths.public.join("robots.txt");

    assert!(matches!(
        classify(&WatchEvent::Modified(robots.clone()), &ctx),
        Action::Rebuild { task: TaskKind::Copy, files: None, .. }
    ));
    assert!(matches!(
        classify(&WatchEvent::Removed(robots), &ctx),
        Action::Remove { artifact: Some(ref p), .. } if *p == site.dist("robots.txt")
    ));
}

#[test]
fn test_unrelated_files_are_ignored() {
    let site = TestSite::new();
    let ctx = dev_context(&site, TaskSlots::default());
    for path in [
        site.paths.src.join("notes.md"),
        site.paths.src.join("types.d.ts"),
        site.paths.root.join("pagekit.toml"),
    ] {
        assert_eq!(classify(&WatchEvent::Modified(path), &ctx), Action::Ignore);
    }
}

// ============================================================================
// end to end
// ============================================================================

fn recorded_templates(recorder: &Recorder) -> TaskSlots {
    TaskSlots::default().with(
        TaskKind::Template,
        recorder.wrap(TaskKind::Template, Task::new(template::run)),
    )
}

#[tokio::test]
async fn test_partial_edit_rebuilds_only_dependents() {
    let site = TestSite::new();
    let nav = site.src("_nav.tpl", "<nav>v1</nav>");
    let index = site.src("index.tpl", "{{> _nav }}\n<main>home</main>");
    site.src("about.tpl", "<main>about</main>");
    let recorder = Recorder::default();
    let ctx = dev_context(&site, recorded_templates(&recorder));

    template::run(Arc::clone(&ctx), TaskOptions::all()).await.unwrap();
    let about_before = fs::metadata(site.dist("about.html")).unwrap().modified().unwrap();
    assert!(site.read_dist("index.html").contains("v1"));

    fs::write(&nav, "<nav>v2</nav>").unwrap();
    handle(Arc::clone(&ctx), WatchEvent::Modified(nav.clone())).await;

    assert_eq!(
        recorder.calls_of(TaskKind::Template),
        vec![TaskOptions::files(vec![nav, index])]
    );
    assert!(site.read_dist("index.html").contains("v2"));
    assert!(!site.dist("_nav.html").exists());
    let about_after = fs::metadata(site.dist("about.html")).unwrap().modified().unwrap();
    assert_eq!(about_before, about_after);
}

#[tokio::test]
async fn test_style_removal_deletes_artifact_and_refreshes_css() {
    let site = TestSite::new();
    let sheet = site.src("css/app.css", ".app { margin: 0; }");
    let ctx = dev_context(
        &site,
        TaskSlots::default().with(TaskKind::Style, Task::new(style::run)),
    );
    style::run(Arc::clone(&ctx), TaskOptions::all()).await.unwrap();
    assert!(site.dist("css/app.css").exists());

    let browser = ctx.live.subscribe();
    fs::remove_file(&sheet).unwrap();
    handle(Arc::clone(&ctx), WatchEvent::Removed(sheet)).await;

    assert!(!site.dist("css/app.css").exists());
    assert_eq!(browser.try_recv(), Ok(LiveEvent::CssUpdate));
    assert!(browser.try_recv().is_err());
}

#[tokio::test]
async fn test_script_removal_deletes_source_map() {
    let site = TestSite::new();
    let mut config = site.config.clone();
    config.debug = true;
    let entry = site.src("js/main.js", "export const n = 1;\n");
    let ctx = Arc::new(BuildContext::new(
        config,
        BuildMode::Development,
        TaskSlots::default().with(TaskKind::Script, Task::new(script::run)),
    ));
    script::run(Arc::clone(&ctx), TaskOptions::all()).await.unwrap();
    assert!(site.dist("js/main.js.map").exists());

    fs::remove_file(&entry).unwrap();
    handle(Arc::clone(&ctx), WatchEvent::Removed(entry)).await;

    assert!(!site.dist("js/main.js").exists());
    assert!(!site.dist("js/main.js.map").exists());
}

#[tokio::test]
async fn test_concurrent_template_edits() {
    let site = TestSite::new();
    let a = site.src("a.tpl", "a1");
    let b = site.src("b.tpl", "b1");
    let recorder = Recorder::default();
    let ctx = dev_context(&site, recorded_templates(&recorder));
    template::run(Arc::clone(&ctx), TaskOptions::all()).await.unwrap();

    fs::write(&a, "a2").unwrap();
    fs::write(&b, "b2").unwrap();
    let first = tokio::spawn(handle(Arc::clone(&ctx), WatchEvent::Modified(a.clone())));
    let second = tokio::spawn(handle(Arc::clone(&ctx), WatchEvent::Modified(b.clone())));
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(site.read_dist("a.html").trim(), "a2");
    assert_eq!(site.read_dist("b.html").trim(), "b2");
    let mut calls = recorder.calls_of(TaskKind::Template);
    calls.sort_by(|x, y| x.files.cmp(&y.files));
    assert_eq!(calls, vec![TaskOptions::files(vec![a]), TaskOptions::files(vec![b])]);
}

#[tokio::test]
async fn test_notification_follows_rebuild() {
    let site = TestSite::new();
    let recorder = Recorder::default();
    let ctx = dev_context(
        &site,
        TaskSlots::default().with(TaskKind::Script, recorder.task(TaskKind::Script, Duration::from_millis(30))),
    );
    let browser = ctx.live.subscribe();

    let action = classify(&WatchEvent::Modified(site.paths.src.join("app.js")), &ctx);
    execute(&ctx, action).await.unwrap();

    assert_eq!(recorder.events(), vec!["start:script", "end:script"]);
    assert_eq!(browser.try_recv(), Ok(LiveEvent::Reload));
}

#[tokio::test]
async fn test_failed_rebuild_is_contained() {
    let site = TestSite::new();
    let ctx = dev_context(
        &site,
        TaskSlots::default().with(TaskKind::Script, failing_task("syntax error")),
    );
    let browser = ctx.live.subscribe();
    let app = site.paths.src.join("app.js");

    let err = execute(&ctx, classify(&WatchEvent::Modified(app.clone()), &ctx))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("syntax error"));

    // The handler swallows it and no notification goes out
    handle(Arc::clone(&ctx), WatchEvent::Modified(app)).await;
    assert!(browser.try_recv().is_err());
}
