//! Event parameter buffer
//!
//! Two parallel buffers describe the registered events: `current` holds
//! the counts known after the last dispatch and `results` receives the
//! counts reported by the engine. Each entry is
//! `[name length][name][4 bytes little endian count]`.

use byteorder::{ByteOrder, LittleEndian};
use std::panic::{self, AssertUnwindSafe};

use crate::{ibase, FbError};

/// Longest event name accepted by the engine
pub const MAX_EVENT_NAME: usize = 127;

#[derive(Debug)]
pub struct Epb<H> {
    current: Vec<u8>,
    results: Vec<u8>,
    handlers: Vec<H>,
}

impl<H> Default for Epb<H> {
    fn default() -> Self {
        Epb {
            current: Vec::new(),
            results: Vec::new(),
            handlers: Vec::new(),
        }
    }
}

impl<H> Epb<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an event with the handler to call when it fires
    pub fn define(&mut self, name: &str, handler: H) -> Result<(), FbError> {
        if name.is_empty() || name.len() > MAX_EVENT_NAME {
            return Err(FbError::logic(
                "EPB::Define",
                "Zero length or longer than 127 chars event names not supported",
            ));
        }

        if self.current.is_empty() {
            self.current.push(ibase::EPB_version1);
            self.results.push(ibase::EPB_version1);
        }

        for buffer in [&mut self.current, &mut self.results] {
            buffer.reserve(1 + name.len() + 4);
            buffer.push(name.len() as u8);
            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(&1i32.to_le_bytes());
        }
        self.handlers.push(handler);

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Count of registered events
    pub fn count(&self) -> usize {
        self.handlers.len()
    }

    /// Size in bytes of each buffer
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn current(&self) -> &[u8] {
        &self.current
    }

    pub fn results(&self) -> &[u8] {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut [u8] {
        &mut self.results
    }

    /// Names of the registered events, in registration order
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.handlers.len());
        let mut pos = 1;

        while let Some(&len) = self.current.get(pos) {
            let len = len as usize;
            match self.current.get(pos + 1..pos + 1 + len) {
                Some(name) => names.push(String::from_utf8_lossy(name).into_owned()),
                None => break,
            }
            pos += 1 + len + 4;
        }

        names
    }

    /// Calls `invoke` for every event whose reported count went past the
    /// known one, with the name and the count difference. A panicking
    /// handler is logged and skipped. Afterwards the reported counts become
    /// the known ones. Returns how many events fired
    pub fn fire_actions<F>(&mut self, mut invoke: F) -> Result<usize, FbError>
    where
        F: FnMut(&mut H, &str, i32),
    {
        let mismatch = || FbError::protocol("EPB::FireActions", "Buffer size mismatch");

        let mut pos = 1;
        let mut fired = 0;

        for handler in self.handlers.iter_mut() {
            let len = *self.current.get(pos).ok_or_else(mismatch)? as usize;
            if self.results.get(pos) != Some(&(len as u8)) {
                return Err(mismatch());
            }

            let name_end = pos + 1 + len;
            let count_end = name_end + 4;
            let name = self.current.get(pos + 1..name_end).ok_or_else(mismatch)?;
            let old = LittleEndian::read_i32(self.current.get(name_end..count_end).ok_or_else(mismatch)?);
            let new = LittleEndian::read_i32(self.results.get(name_end..count_end).ok_or_else(mismatch)?);

            if new > old {
                fired += 1;
                let name = String::from_utf8_lossy(name);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    invoke(handler, &name, new - old)
                }));
                if outcome.is_err() {
                    log::warn!("Handler of the event '{}' panicked", name);
                }
            }

            pos = count_end;
        }

        if self.current.len() != self.results.len() {
            return Err(mismatch());
        }
        self.current.copy_from_slice(&self.results);

        Ok(fired)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Calls = Vec<(String, i32)>;

    fn set_count(epb: &mut Epb<usize>, index: usize, count: i32) {
        let mut pos = 1;
        for _ in 0..index {
            pos += 1 + epb.results()[pos] as usize + 4;
        }
        let start = pos + 1 + epb.results()[pos] as usize;
        epb.results_mut()[start..start + 4].copy_from_slice(&count.to_le_bytes());
    }

    #[test]
    fn define_layout() {
        let mut epb = Epb::new();
        epb.define("NEW_ORDER", 0usize).unwrap();
        epb.define("X", 1usize).unwrap();

        assert_eq!(2, epb.count());
        assert_eq!(1 + (1 + 9 + 4) + (1 + 1 + 4), epb.len());
        assert_eq!(epb.current(), epb.results());
        assert_eq!(&[1, 9], &epb.current()[..2]);
        assert_eq!(&[1, 0, 0, 0], &epb.current()[11..15]);
        assert_eq!(vec!["NEW_ORDER".to_string(), "X".to_string()], epb.names());
    }

    #[test]
    fn invalid_names() {
        let mut epb = Epb::new();

        assert!(epb.define("", 0usize).unwrap_err().is_logic());
        assert!(epb.define(&"E".repeat(128), 0usize).unwrap_err().is_logic());
        assert!(epb.define(&"E".repeat(127), 0usize).is_ok());
    }

    #[test]
    fn nothing_fired() {
        let mut epb = Epb::new();
        epb.define("A", 0usize).unwrap();
        epb.define("B", 1usize).unwrap();
        let before = epb.current().to_vec();

        let mut calls: Calls = vec![];
        let fired = epb
            .fire_actions(|_, name, delta| calls.push((name.to_string(), delta)))
            .unwrap();

        assert_eq!(0, fired);
        assert!(calls.is_empty());
        assert_eq!(before, epb.current());
    }

    #[test]
    fn deltas() {
        let mut epb = Epb::new();
        epb.define("A", 0usize).unwrap();
        epb.define("B", 1usize).unwrap();
        epb.define("C", 2usize).unwrap();

        set_count(&mut epb, 0, 4);
        set_count(&mut epb, 2, 2);

        let mut calls: Vec<(usize, String, i32)> = vec![];
        let fired = epb
            .fire_actions(|h, name, delta| calls.push((*h, name.to_string(), delta)))
            .unwrap();

        assert_eq!(2, fired);
        assert_eq!(
            vec![(0, "A".to_string(), 3), (2, "C".to_string(), 1)],
            calls
        );
        assert_eq!(epb.current(), epb.results());

        // Same counts again, nothing new
        let fired = epb.fire_actions(|_, _, _| {}).unwrap();
        assert_eq!(0, fired);
    }

    #[test]
    fn panicking_handler() {
        let mut epb = Epb::new();
        epb.define("A", 0usize).unwrap();
        epb.define("B", 1usize).unwrap();
        set_count(&mut epb, 0, 2);
        set_count(&mut epb, 1, 2);

        let mut called = vec![];
        let fired = epb
            .fire_actions(|h, _, _| {
                called.push(*h);
                if *h == 0 {
                    panic!("handler failure");
                }
            })
            .unwrap();

        assert_eq!(2, fired);
        assert_eq!(vec![0, 1], called);
    }

    #[test]
    fn mismatched_buffers() {
        let mut epb = Epb::new();
        epb.define("A", 0usize).unwrap();

        // Results no longer describe the same event
        epb.results_mut()[1] = 5;

        assert!(epb.fire_actions(|_, _, _| {}).unwrap_err().is_protocol());
    }
}
