//! Non owning lists of the objects attached to a database or a transaction,
//! used to cascade the cleanup

use std::{
    cell::RefCell,
    ptr,
    rc::{Rc, Weak},
};

pub(crate) struct Dependents<T> {
    items: Vec<Weak<RefCell<T>>>,
}

impl<T> Default for Dependents<T> {
    fn default() -> Self {
        Dependents { items: vec![] }
    }
}

impl<T> Dependents<T> {
    fn position(&self, item: &Rc<RefCell<T>>) -> Option<usize> {
        self.items
            .iter()
            .position(|w| ptr::eq(w.as_ptr(), Rc::as_ptr(item)))
    }

    pub fn attach(&mut self, item: &Rc<RefCell<T>>) {
        // Dropped objects are only forgotten here
        self.items.retain(|w| w.strong_count() > 0);

        if self.position(item).is_none() {
            self.items.push(Rc::downgrade(item));
        }
    }

    /// False when the item wasn't attached
    pub fn detach(&mut self, item: &Rc<RefCell<T>>) -> bool {
        match self.position(item) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// The live items, last attached first
    pub fn alive(&self) -> Vec<Rc<RefCell<T>>> {
        self.items.iter().rev().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|w| w.strong_count() > 0).count()
    }
}

/// Crate methods of a handle type keeping a `Dependents` list named `$list`
macro_rules! tracking {
    ($list: ident, $item: ty, $attach: ident, $forget: ident, $detach: ident, $origin: literal) => {
        pub(crate) fn $attach(&self, item: &std::rc::Rc<std::cell::RefCell<$item>>) {
            self.0.borrow_mut().$list.attach(item);
        }

        /// Like the detach, for callers moving the item elsewhere
        pub(crate) fn $forget(&self, item: &std::rc::Rc<std::cell::RefCell<$item>>) {
            self.0.borrow_mut().$list.detach(item);
        }

        pub(crate) fn $detach(
            &self,
            item: &std::rc::Rc<std::cell::RefCell<$item>>,
        ) -> Result<(), ibpp_core::FbError> {
            if self.0.borrow_mut().$list.detach(item) {
                Ok(())
            } else {
                Err(ibpp_core::FbError::logic($origin, "The object was not attached."))
            }
        }
    };
}

pub(crate) use tracking;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attach_detach() {
        let mut deps = Dependents::default();
        let a = Rc::new(RefCell::new(1));
        let b = Rc::new(RefCell::new(2));

        deps.attach(&a);
        deps.attach(&b);
        deps.attach(&a);
        assert_eq!(2, deps.len());
        assert_eq!(2, *deps.alive()[0].borrow());

        assert!(deps.detach(&a));
        assert!(!deps.detach(&a));
        assert_eq!(1, deps.len());

        drop(b);
        assert_eq!(0, deps.len());
        assert!(deps.alive().is_empty());
    }
}
