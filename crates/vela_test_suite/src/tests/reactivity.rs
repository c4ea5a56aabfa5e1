//! Reactivity scenarios
//!
//! Batching of effect reruns, memoized derivations and consistency of values
//! observed by effects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::ensure;
use vela_core::{Object, ReactiveEffect};
use vela_runtime::{h, ComponentDef, Job, Props};

use crate::runner::TestSuite;

/// Create the reactivity suite
pub fn suite() -> TestSuite {
    let mut suite = TestSuite::new("reactivity");

    // Many writes to one property, one rerun per flush
    suite.add("batched_effect_reruns", |ctx| {
        let graph = &ctx.runtime.reactive;
        let state = graph.reactive(&Object::new().with("count", 0));
        let runs = Rc::new(Cell::new(0));

        let r = runs.clone();
        let job = Job::new(move || r.set(r.get() + 1));
        let scheduler = ctx.runtime.scheduler.clone();
        let s = state.clone();
        let effect = ReactiveEffect::with_scheduler(
            graph,
            move || {
                let _ = s.get("count");
            },
            move || scheduler.queue_job(job.clone()),
        );
        effect.run();

        for i in 1..=10 {
            state.set("count", i);
        }
        ensure!(runs.get() == 0, "ran before flush");
        ensure!(ctx.runtime.scheduler.queued_jobs() == 1);

        ensure!(ctx.flush() == 1);
        ensure!(runs.get() == 1, "ran {} times", runs.get());
        ensure!(ctx.flush() == 0);
        Ok(())
    });

    // Computed values recompute only when read after a change
    suite.add("computed_memoization", |ctx| {
        let graph = &ctx.runtime.reactive;
        let price = graph.create_ref(10);
        let qty = graph.create_ref(2);
        let computations = Rc::new(Cell::new(0));

        let (p, q, c) = (price.clone(), qty.clone(), computations.clone());
        let total = graph.create_computed(move || {
            c.set(c.get() + 1);
            p.get() * q.get()
        });

        ensure!(computations.get() == 0, "computed eagerly");
        ensure!(total.get() == 20);
        ensure!(total.get() == 20);
        ensure!(computations.get() == 1);

        price.set(11);
        qty.set(3);
        ensure!(computations.get() == 1, "recomputed before read");
        ensure!(total.is_dirty());
        ensure!(total.get() == 33);
        ensure!(computations.get() == 2);

        // Same value: no invalidation
        qty.set(3);
        ensure!(!total.is_dirty());
        Ok(())
    });

    // An effect reading a value and a value derived from it never sees them disagree
    suite.add("no_torn_reads", |ctx| {
        let graph = &ctx.runtime.reactive;
        let a = graph.create_ref(1i64);
        let a2 = a.clone();
        let doubled = graph.create_computed(move || a2.get() * 2);

        let seen: Rc<RefCell<Vec<(i64, i64)>>> = Rc::default();
        let (a3, d, s) = (a.clone(), doubled.clone(), seen.clone());
        let _effect = graph.create_effect(move || s.borrow_mut().push((a3.get(), d.get())));

        for value in [2, 3, 7] {
            a.set(value);
        }

        let seen = seen.borrow();
        ensure!(seen.iter().all(|&(a, d)| d == a * 2), "torn read in {seen:?}");
        ensure!(seen.last() == Some(&(7, 14)));
        Ok(())
    });

    // Adding a key reruns effects that iterated the object
    suite.add("key_iteration", |ctx| {
        let graph = &ctx.runtime.reactive;
        let state = graph.reactive(&Object::new().with("a", 1));
        let key_counts = Rc::new(RefCell::new(Vec::new()));

        let (s, k) = (state.clone(), key_counts.clone());
        let _effect = graph.create_effect(move || k.borrow_mut().push(s.keys().len()));

        state.set("a", 2);
        state.set("b", 1);
        state.remove("a");
        ensure!(*key_counts.borrow() == [1, 2, 1], "got {:?}", key_counts.borrow());
        Ok(())
    });

    // A computed read during render keeps the component up to date
    suite.add("computed_in_render", |ctx| {
        let graph = &ctx.runtime.reactive;
        let items = graph.reactive(&Object::new().with("a", 1).with("b", 2));
        let s = items.clone();
        let sum = graph.create_computed(move || {
            s.keys()
                .iter()
                .map(|key| s.get(key).as_i64().unwrap_or(0))
                .sum::<i64>()
        });

        let comp = ComponentDef::new("Sum")
            .render(move |_| Ok(h("p", sum.get().to_string())))
            .build();
        let app = ctx.mount(&comp, Props::new())?;
        ensure!(ctx.html() == "<p>3</p>");

        items.set("c", 4);
        items.set("a", 0);
        app.flush();
        ensure!(ctx.html() == "<p>6</p>", "got {}", ctx.html());
        Ok(())
    });

    // Stats reflect live effects and queued work
    suite.add("runtime_stats", |ctx| {
        let count = ctx.runtime.reactive.create_ref(0);
        let c = count.clone();
        let comp = ComponentDef::new("Stats")
            .render(move |_| Ok(h("p", c.get().to_string())))
            .build();

        let app = ctx.mount(&comp, Props::new())?;
        let stats = ctx.runtime.stats();
        ensure!(stats.reactive.effect_count == 1, "{stats:?}");
        ensure!(stats.queued_jobs == 0 && !stats.flush_pending);

        count.set(1);
        let stats = ctx.runtime.stats();
        ensure!(stats.queued_jobs == 1 && stats.flush_pending);

        app.unmount()?;
        ensure!(ctx.runtime.stats().reactive.effect_count == 0);
        Ok(())
    });

    suite
}
