//! This module is for testing only

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type DropFlag<T> = Rc<RefCell<T>>;

/// Bumps its flag when dropped.
pub struct Droppable {
    pub dropflag: DropFlag<i32>,
}

impl Drop for Droppable {
    fn drop(&mut self) {
        *self.dropflag.borrow_mut() += 1;
    }
}

/// Value that bumps its flag when dropped and can be cloned only while the shared budget lasts.
#[derive(Debug)]
pub struct Fragile {
    pub value: i32,
    budget: Rc<Cell<usize>>,
    dropflag: DropFlag<i32>,
}

impl Clone for Fragile {
    fn clone(&self) -> Self {
        let left = self.budget.get();
        if left == 0 {
            panic!("clone budget exhausted");
        }
        self.budget.set(left - 1);
        Fragile {
            value: self.value,
            budget: self.budget.clone(),
            dropflag: self.dropflag.clone(),
        }
    }
}

impl PartialEq for Fragile {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for Fragile {
    fn drop(&mut self) {
        *self.dropflag.borrow_mut() += 1;
    }
}

/// Shared clone allowance for a family of `Fragile` values.
pub struct CloneBudget {
    left: Rc<Cell<usize>>,
}

impl CloneBudget {
    pub fn new(clones: usize) -> CloneBudget {
        CloneBudget { left: Rc::new(Cell::new(clones)) }
    }

    pub fn set(&self, clones: usize) {
        self.left.set(clones);
    }

    pub fn item(&self, value: i32, dropflag: &DropFlag<i32>) -> Fragile {
        Fragile {
            value,
            budget: self.left.clone(),
            dropflag: dropflag.clone(),
        }
    }
}

thread_local! {
    static CONSTRUCTED: Cell<usize> = Cell::new(0);
    static LIVE: Cell<isize> = Cell::new(0);
    static FAIL_AT: Cell<usize> = Cell::new(usize::MAX);
}

/// Default-constructible value that counts constructions per thread and panics on a chosen one.
#[derive(Debug, PartialEq)]
pub struct Tally {
    pub serial: usize,
}

impl Tally {
    /// Resets the counters of the current thread; construction number `fail_at` (1-based) will panic.
    pub fn reset(fail_at: Option<usize>) {
        CONSTRUCTED.with(|c| c.set(0));
        LIVE.with(|l| l.set(0));
        FAIL_AT.with(|f| f.set(fail_at.unwrap_or(usize::MAX)));
    }

    pub fn constructed() -> usize {
        CONSTRUCTED.with(|c| c.get())
    }

    pub fn live() -> isize {
        LIVE.with(|l| l.get())
    }

    fn construct() -> Tally {
        let serial = CONSTRUCTED.with(|c| {
            c.set(c.get() + 1);
            c.get()
        });
        if FAIL_AT.with(|f| f.get()) == serial {
            panic!("construction {} fails", serial);
        }
        LIVE.with(|l| l.set(l.get() + 1));
        Tally { serial }
    }
}

impl Default for Tally {
    fn default() -> Self {
        Tally::construct()
    }
}

impl Clone for Tally {
    fn clone(&self) -> Self {
        Tally::construct()
    }
}

impl Drop for Tally {
    fn drop(&mut self) {
        LIVE.with(|l| l.set(l.get() - 1));
    }
}

#[test]
fn dropflag() {
    let flag = DropFlag::new(RefCell::new(0));
    let droppable = Droppable { dropflag: flag.clone() };
    assert_eq!(0, *flag.borrow());
    std::mem::drop(droppable);
    assert_eq!(1, *flag.borrow());
}

#[test]
fn fragile_clone_respects_budget() {
    let flag = DropFlag::new(RefCell::new(0));
    let budget = CloneBudget::new(1);
    let original = budget.item(3, &flag);
    let copy = original.clone();
    assert_eq!(original, copy);
    assert!(std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| original.clone())).is_err());
}

#[test]
fn tally_fails_on_chosen_construction() {
    Tally::reset(Some(2));
    let first = Tally::default();
    assert_eq!(1, first.serial);
    assert!(std::panic::catch_unwind(Tally::default).is_err());
    assert_eq!(1, Tally::live());
    drop(first);
    assert_eq!(0, Tally::live());
}
