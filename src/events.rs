//!
//! Rust Firebird Client
//!
//! Asynchronous event notifications
//!

use std::{
    os::raw::c_void,
    slice,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use ibpp_core::{ibase, Epb, FbClient, FbError, Status};

use crate::database::Database;

/// Receives the events posted on a database
pub trait EventHandler {
    /// Called from [`Database::dispatch_events`] with how many times the
    /// event was posted since the last dispatch
    fn on_event(&mut self, db: &Database, name: &str, count: i32);
}

impl<F> EventHandler for F
where
    F: FnMut(&Database, &str, i32),
{
    fn on_event(&mut self, db: &Database, name: &str, count: i32) {
        self(db, name, count)
    }
}

/// Shared with the engine thread running the completion callback
#[derive(Default)]
pub(crate) struct EventSlot {
    /// A wait is outstanding
    pub queued: AtomicBool,
    /// The engine reported counts not yet dispatched
    pub filled: AtomicBool,
    /// The engine reported more bytes than the registered events hold
    pub overflow: AtomicBool,
    pub results: Mutex<Vec<u8>>,
}

/// Completion routine of `isc_que_events`. Runs on an engine thread, so it
/// only copies the counts and clears the queued flag.
///
/// # Safety
/// `arg` must be null or point to the `EventSlot` given when queueing, and
/// `updated` must hold `len` readable bytes
pub(crate) unsafe extern "C" fn event_callback(arg: *mut c_void, len: u16, updated: *const u8) {
    if arg.is_null() {
        return;
    }
    let slot = &*(arg as *const EventSlot);

    if !updated.is_null() && len > 0 {
        let bytes = slice::from_raw_parts(updated, len as usize);

        if let Ok(mut results) = slot.results.lock() {
            if bytes.len() > results.len() {
                slot.overflow.store(true, Ordering::SeqCst);
            } else {
                results[..bytes.len()].copy_from_slice(bytes);
                slot.filled.store(true, Ordering::SeqCst);
            }
        }
    }

    slot.queued.store(false, Ordering::SeqCst);
}

/// The registered events of a database
pub(crate) struct Events {
    pub epb: Epb<Box<dyn EventHandler>>,
    pub slot: Arc<EventSlot>,
    pub id: ibase::ISC_LONG,
}

impl Events {
    pub fn new() -> Self {
        Events {
            epb: Epb::new(),
            slot: Arc::new(EventSlot::default()),
            id: 0,
        }
    }

    pub fn queued(&self) -> bool {
        self.slot.queued.load(Ordering::SeqCst)
    }

    /// Waits asynchronously for any of the events
    pub fn queue(
        &mut self,
        client: &dyn FbClient,
        db: &mut ibase::isc_db_handle,
    ) -> Result<(), FbError> {
        if self.epb.is_empty() || self.queued() {
            return Ok(());
        }

        if let Ok(mut results) = self.slot.results.lock() {
            results.clear();
            results.resize(self.epb.len(), 0);
        }

        self.slot.queued.store(true, Ordering::SeqCst);

        let mut status = Status::default();
        client.que_events(
            &mut status,
            db,
            &mut self.id,
            self.epb.current(),
            event_callback,
            Arc::as_ptr(&self.slot) as *mut c_void,
        );

        if status.has_errors() {
            self.slot.queued.store(false, Ordering::SeqCst);
            return Err(status.as_error(client, "Database::QueueEvents", "isc_que_events failed"));
        }

        Ok(())
    }

    /// Cancels the outstanding wait, if any
    pub fn cancel(
        &mut self,
        client: &dyn FbClient,
        db: &mut ibase::isc_db_handle,
    ) -> Result<(), FbError> {
        if !self.queued() {
            return Ok(());
        }

        let mut status = Status::default();
        client.cancel_events(&mut status, db, &mut self.id);
        status.check(client, "Database::CancelEvents", "isc_cancel_events failed")?;

        self.slot.queued.store(false, Ordering::SeqCst);
        self.slot.filled.store(false, Ordering::SeqCst);

        Ok(())
    }

    /// Moves the counts reported by the engine to the epb. Errors when the
    /// engine reported a buffer larger than expected
    pub fn collect(&mut self) -> Result<(), FbError> {
        if self.slot.overflow.swap(false, Ordering::SeqCst) {
            return Err(FbError::protocol(
                "Database::DispatchEvents",
                "The engine reported more event data than registered.",
            ));
        }

        if self.slot.filled.swap(false, Ordering::SeqCst) {
            let results = self
                .slot
                .results
                .lock()
                .map_err(|_| FbError::protocol("Database::DispatchEvents", "Event results lost"))?;
            let target = self.epb.results_mut();
            let n = target.len().min(results.len());
            target[..n].copy_from_slice(&results[..n]);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn callback_copies_and_clears() {
        let slot = EventSlot::default();
        *slot.results.lock().unwrap() = vec![0; 4];
        slot.queued.store(true, Ordering::SeqCst);

        let data = [1u8, 2, 3];
        unsafe {
            event_callback(
                &slot as *const EventSlot as *mut c_void,
                data.len() as u16,
                data.as_ptr(),
            )
        };

        assert!(!slot.queued.load(Ordering::SeqCst));
        assert!(slot.filled.load(Ordering::SeqCst));
        assert_eq!(&[1, 2, 3, 0], slot.results.lock().unwrap().as_slice());
    }

    #[test]
    fn callback_flags_oversized_data() {
        let slot = EventSlot::default();
        *slot.results.lock().unwrap() = vec![0; 2];
        slot.queued.store(true, Ordering::SeqCst);

        let data = [9u8; 8];
        unsafe {
            event_callback(
                &slot as *const EventSlot as *mut c_void,
                data.len() as u16,
                data.as_ptr(),
            )
        };

        assert!(!slot.queued.load(Ordering::SeqCst));
        assert!(slot.overflow.load(Ordering::SeqCst));
        assert_eq!(&[0, 0], slot.results.lock().unwrap().as_slice());

        unsafe { event_callback(std::ptr::null_mut(), 0, std::ptr::null()) };
    }
}
