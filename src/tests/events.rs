//!
//! Rust Firebird Client
//!
//! Event notification tests
//!

mk_tests_default! {
    use std::{cell::RefCell, rc::Rc};

    use crate::{Database, FbError};

    type Calls = Rc<RefCell<Vec<(String, i32)>>>;

    /// Handler recording its calls
    fn recorder(calls: &Calls) -> impl FnMut(&Database, &str, i32) + 'static {
        let calls = calls.clone();
        move |_db: &Database, name: &str, count: i32| calls.borrow_mut().push((name.to_string(), count))
    }

    #[test]
    fn posted_events_reach_the_handler() -> Result<(), FbError> {
        let fx = connect();
        let calls = Calls::default();

        fx.db.define_event("ORDER_PLACED", recorder(&calls))?;
        assert_eq!(vec!["ORDER_PLACED"], fx.db.event_names());

        // The first dispatch only queues the wait
        fx.db.dispatch_events()?;
        assert_eq!(1, fx.fake.queued_waits());
        assert!(calls.borrow().is_empty());

        // Nothing posted, nothing to do
        fx.db.dispatch_events()?;
        assert_eq!(1, fx.fake.calls("que_events"));

        fx.fake.post_event("ORDER_PLACED", 2);
        fx.db.dispatch_events()?;
        assert_eq!(vec![("ORDER_PLACED".to_string(), 2)], *calls.borrow());
        assert_eq!(1, fx.fake.queued_waits());

        fx.fake.post_event("ORDER_PLACED", 1);
        fx.db.dispatch_events()?;
        assert_eq!(("ORDER_PLACED".to_string(), 1), calls.borrow()[1]);

        Ok(())
    }

    #[test]
    fn only_the_posted_events_fire() -> Result<(), FbError> {
        let fx = connect();
        let calls = Calls::default();

        fx.db.define_event("ORDER_PLACED", recorder(&calls))?;
        fx.db.define_event("ORDER_SHIPPED", recorder(&calls))?;
        fx.db.dispatch_events()?;

        fx.fake.post_event("ORDER_SHIPPED", 1);
        fx.db.dispatch_events()?;

        assert_eq!(vec![("ORDER_SHIPPED".to_string(), 1)], *calls.borrow());

        Ok(())
    }

    #[test]
    fn defining_cancels_the_wait() -> Result<(), FbError> {
        let fx = connect();
        let calls = Calls::default();

        fx.db.define_event("ORDER_PLACED", recorder(&calls))?;
        fx.db.dispatch_events()?;
        assert_eq!(1, fx.fake.queued_waits());

        fx.db.define_event("ORDER_SHIPPED", recorder(&calls))?;
        assert_eq!(1, fx.fake.calls("cancel_events"));
        assert_eq!(0, fx.fake.queued_waits());

        fx.db.dispatch_events()?;
        fx.fake.post_event("ORDER_SHIPPED", 1);
        fx.db.dispatch_events()?;
        assert_eq!(vec![("ORDER_SHIPPED".to_string(), 1)], *calls.borrow());

        Ok(())
    }

    #[test]
    fn clear_cancels_and_forgets() -> Result<(), FbError> {
        let fx = connect();
        let calls = Calls::default();

        fx.db.define_event("ORDER_PLACED", recorder(&calls))?;
        fx.db.dispatch_events()?;

        fx.db.clear_events()?;
        assert_eq!(0, fx.fake.queued_waits());
        assert!(fx.db.event_names().is_empty());

        fx.db.dispatch_events()?;
        assert_eq!(1, fx.fake.calls("que_events"));

        Ok(())
    }

    #[test]
    fn events_need_a_connection() -> Result<(), FbError> {
        let fx = connect();
        fx.db.disconnect()?;

        let err = fx.db.define_event("ORDER_PLACED", |_: &Database, _: &str, _: i32| {}).unwrap_err();
        assert_eq!("Database is not connected.", err.message());

        Ok(())
    }

    #[test]
    fn event_names_are_checked() -> Result<(), FbError> {
        let fx = connect();

        let long = "E".repeat(128);
        for name in ["", long.as_str()] {
            let err = fx.db.define_event(name, |_: &Database, _: &str, _: i32| {}).unwrap_err();
            assert!(err.is_logic());
        }
        fx.db.define_event(&long[..127], |_: &Database, _: &str, _: i32| {})?;

        Ok(())
    }

    #[test]
    fn handlers_cant_change_the_events() -> Result<(), FbError> {
        let fx = connect();
        let errors: Rc<RefCell<Vec<String>>> = Default::default();

        let seen = errors.clone();
        fx.db.define_event("ORDER_PLACED", move |db: &Database, _: &str, _: i32| {
            let define = db.define_event("OTHER", |_: &Database, _: &str, _: i32| {});
            let clear = db.clear_events();
            let dispatch = db.dispatch_events();

            for result in [define, clear, dispatch] {
                if let Err(e) = result {
                    seen.borrow_mut().push(e.message());
                }
            }
        })?;
        fx.db.dispatch_events()?;
        fx.fake.post_event("ORDER_PLACED", 1);
        fx.db.dispatch_events()?;

        assert_eq!(
            vec![
                "Events can't change while they are dispatched.",
                "Events can't change while they are dispatched.",
                "Events are already being dispatched.",
            ],
            *errors.borrow()
        );
        assert_eq!(vec!["ORDER_PLACED"], fx.db.event_names());

        Ok(())
    }

    #[test]
    fn panicking_handlers_are_skipped() -> Result<(), FbError> {
        let fx = connect();
        let calls = Calls::default();

        fx.db.define_event("FIRST", |_: &Database, _: &str, _: i32| panic!("handler failure"))?;
        fx.db.define_event("SECOND", recorder(&calls))?;
        fx.db.dispatch_events()?;

        fx.fake.post_event("FIRST", 1);
        fx.db.dispatch_events()?;
        fx.fake.post_event("SECOND", 1);
        fx.db.dispatch_events()?;

        assert_eq!(vec![("SECOND".to_string(), 1)], *calls.borrow());

        Ok(())
    }

    #[test]
    fn oversized_results_are_refused() -> Result<(), FbError> {
        let fx = connect();
        let calls = Calls::default();

        fx.db.define_event("ORDER_PLACED", recorder(&calls))?;
        fx.db.dispatch_events()?;

        fx.fake.post_oversized();
        let err = fx.db.dispatch_events().unwrap_err();
        assert!(err.is_protocol());
        assert!(calls.borrow().is_empty());

        // The events survive the failure
        assert_eq!(vec!["ORDER_PLACED"], fx.db.event_names());

        Ok(())
    }

    #[test]
    fn disconnect_cancels_the_wait() -> Result<(), FbError> {
        let fx = connect();

        fx.db.define_event("ORDER_PLACED", |_: &Database, _: &str, _: i32| {})?;
        fx.db.dispatch_events()?;
        fx.db.disconnect()?;

        assert_eq!(0, fx.fake.queued_waits());
        assert!(fx.db.event_names().is_empty());

        Ok(())
    }
}
