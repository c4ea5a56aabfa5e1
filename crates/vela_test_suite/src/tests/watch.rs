//! Watcher scenarios

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::ensure;
use vela_core::{Field, Object};
use vela_runtime::{h, ComponentDef, FlushMode, Props, WatchOptions, WatchSource};

use crate::runner::TestSuite;

/// Create the watch suite
pub fn suite() -> TestSuite {
    let mut suite = TestSuite::new("watch");

    // Two writes before a flush: one callback with the final value
    suite.add("coalesced", |ctx| {
        let count = ctx.runtime.reactive.create_ref(0);
        let log: Rc<RefCell<Vec<(i32, Option<i32>)>>> = Rc::default();

        let l = log.clone();
        let _handle = ctx.runtime.watch(
            count.clone(),
            move |new: &i32, old: Option<&i32>| l.borrow_mut().push((*new, old.copied())),
            WatchOptions::default(),
        );

        count.set(1);
        count.set(2);
        ensure!(log.borrow().is_empty(), "called before flush");
        ctx.flush();
        ensure!(*log.borrow() == [(2, Some(0))], "got {:?}", log.borrow());
        Ok(())
    });

    // Post-flush callbacks observe the patched host tree
    suite.add("post_flush_sees_render", |ctx| {
        let count = ctx.runtime.reactive.create_ref(0);
        let c = count.clone();
        let comp = ComponentDef::new("Counter")
            .render(move |_| Ok(h("p", c.get().to_string())))
            .build();
        let app = ctx.mount(&comp, Props::new())?;

        let observed: Rc<RefCell<Vec<String>>> = Rc::default();
        let (o, host, root) = (observed.clone(), ctx.host.clone(), ctx.root);
        let _handle = ctx.runtime.watch(
            count.clone(),
            move |_: &i32, _| o.borrow_mut().push(host.inner_html(root)),
            WatchOptions::default().flush(FlushMode::Post),
        );

        count.set(5);
        app.flush();
        ensure!(*observed.borrow() == ["<p>5</p>"], "got {:?}", observed.borrow());
        Ok(())
    });

    // Deep getter watch fires on nested writes
    suite.add("deep_nested_field", |ctx| {
        let graph = &ctx.runtime.reactive;
        let profile = Object::new().with("name", "ada");
        let state = graph.reactive(&Object::new().with("profile", profile.clone()));
        let calls = Rc::new(RefCell::new(0));

        let s = state.clone();
        let c = calls.clone();
        let _handle = ctx.runtime.watch(
            WatchSource::getter(move || s.get("profile")),
            move |_: &Field, _| *c.borrow_mut() += 1,
            WatchOptions::default().deep(),
        );

        graph.reactive(&profile).set("name", "grace");
        ctx.flush();
        ensure!(*calls.borrow() == 1, "deep watch missed nested write");

        // Shallow watchers of the same getter see no change
        let s = state.clone();
        let shallow = Rc::new(RefCell::new(0));
        let sc = shallow.clone();
        let _shallow = ctx.runtime.watch(
            WatchSource::getter(move || s.get("profile")),
            move |_: &Field, _| *sc.borrow_mut() += 1,
            WatchOptions::default(),
        );
        graph.reactive(&profile).set("name", "hopper");
        ctx.flush();
        ensure!(*shallow.borrow() == 0);
        ensure!(*calls.borrow() == 2);
        Ok(())
    });

    // Immediate and sync watchers
    suite.add("immediate_and_sync", |ctx| {
        let name = ctx.runtime.reactive.create_ref("a".to_string());
        let log: Rc<RefCell<Vec<(String, Option<String>)>>> = Rc::default();

        let l = log.clone();
        let _handle = ctx.runtime.watch(
            name.clone(),
            move |new: &String, old: Option<&String>| {
                l.borrow_mut().push((new.clone(), old.cloned()))
            },
            WatchOptions::default().immediate().flush(FlushMode::Sync),
        );
        ensure!(*log.borrow() == [("a".to_string(), None)]);

        name.set("b".to_string());
        ensure!(log.borrow().len() == 2, "sync watcher deferred");
        ensure!(log.borrow()[1] == ("b".to_string(), Some("a".to_string())));
        Ok(())
    });

    // A stopped watcher never calls back, even with a pending job
    suite.add("stop", |ctx| {
        let count = ctx.runtime.reactive.create_ref(0);
        let calls = Rc::new(RefCell::new(0));

        let c = calls.clone();
        let handle = ctx.runtime.watch(
            count.clone(),
            move |_: &i32, _| *c.borrow_mut() += 1,
            WatchOptions::default(),
        );

        count.set(1);
        handle.stop();
        ctx.flush();
        count.set(2);
        ctx.flush();
        ensure!(*calls.borrow() == 0);
        ensure!(ctx.runtime.stats().reactive.effect_count == 0);
        Ok(())
    });

    suite
}
