//! NDR pointers and deferred bodies
//!
//! NDR flattens every embedded pointer into a referent id written inline and
//! a body written after the fixed part of the enclosing structure. Three
//! kinds are supported:
//!
//! - Reference (`[ref]`): never null. At top level it has no wire form at
//!   all; embedded, it carries a referent id from the session counter.
//! - Unique (`[unique]`): nullable, no aliasing. Non-null pointers carry the
//!   fixed marker [`UNIQUE_REFERENT`]; the decoder only tests for zero.
//! - Full (`[ptr]`): nullable, aliasing allowed. Targets are shared
//!   ([`FullPtr`]), the first occurrence carries the body and later ones only
//!   repeat its referent id.
//!
//! Bodies are queued per scope and drained first-in first-out. Pointers met
//! while coding one body open a nested scope that drains before the next
//! sibling, so a structure's pointees follow it in field order and each
//! pointee is followed by its own. The one exception is a full pointer met
//! inside a full pointer target: its body follows all other pointees of that
//! target.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::cursor::ByteCursor;
use crate::pdu::{Direction, NdrCoder, Pdu};
use crate::{NdrError, Result};

/// Referent id written for every non-null unique pointer ("Uptr")
pub const UNIQUE_REFERENT: u64 = 0x7274_7055;

/// First referent id handed out for reference and full pointers
pub const FIRST_REFERENT: u64 = 0x0002_0000;

const REFERENT_STEP: u64 = 4;

/// Body of a full pointer target
pub(crate) struct SharedBody {
    referent: u64,
    /// Full pointer targets on the path to this one, itself included
    depth: usize,
    target: Rc<RefCell<dyn NdrCoder>>,
}

/// A pending pointee body
pub(crate) enum Deferred<'v> {
    /// Body owned by the enclosing value tree
    Body {
        referent: Option<u64>,
        target: &'v mut dyn NdrCoder,
    },
    Shared(SharedBody),
}

impl Deferred<'_> {
    fn referent(&self) -> Option<u64> {
        match self {
            Deferred::Body { referent, .. } => *referent,
            Deferred::Shared(body) => Some(body.referent),
        }
    }
}

enum Seen {
    /// Reference pointer target, owned in place
    Inline,
    /// Full pointer target; identity only, ownership stays with the tree
    Shared(Weak<dyn Any>),
}

/// Referent ids of one session
///
/// Encoding numbers pointers in traversal order and remembers full pointer
/// targets by identity. Decoding remembers every referent id it has read so
/// aliases resolve to the first target.
#[derive(Default)]
pub(crate) struct ReferentTable {
    assigned: u64,
    by_identity: HashMap<usize, u64>,
    seen: HashMap<u64, Seen>,
}

impl ReferentTable {
    fn allocate(&mut self) -> u64 {
        let referent = FIRST_REFERENT + self.assigned * REFERENT_STEP;
        self.assigned += 1;
        referent
    }

    /// Referent id for a full pointer target and whether it is new
    fn identify<T>(&mut self, target: &Rc<RefCell<T>>) -> (u64, bool) {
        let identity = Rc::as_ptr(target) as *const () as usize;
        if let Some(&referent) = self.by_identity.get(&identity) {
            return (referent, false);
        }
        let referent = self.allocate();
        self.by_identity.insert(identity, referent);
        (referent, true)
    }

    fn claim_inline(&mut self, referent: u64, offset: usize) -> Result<()> {
        if self.seen.contains_key(&referent) {
            return Err(NdrError::ReferentConflict { offset, referent });
        }
        self.seen.insert(referent, Seen::Inline);
        Ok(())
    }

    fn record_shared<T: 'static>(&mut self, referent: u64, target: &Rc<RefCell<T>>) {
        let target: Rc<dyn Any> = target.clone();
        self.seen.insert(referent, Seen::Shared(Rc::downgrade(&target)));
    }

    /// Earlier target for `referent`, if one was decoded
    fn resolve<T: 'static>(
        &self,
        referent: u64,
        offset: usize,
    ) -> Result<Option<Rc<RefCell<T>>>> {
        match self.seen.get(&referent) {
            None => Ok(None),
            Some(Seen::Shared(target)) => target
                .upgrade()
                .and_then(|target| target.downcast::<RefCell<T>>().ok())
                .map(Some)
                .ok_or(NdrError::ReferentConflict { offset, referent }),
            Some(Seen::Inline) => Err(NdrError::ReferentConflict { offset, referent }),
        }
    }
}

/// Full pointer field: nullable and possibly shared with other fields
pub struct FullPtr<T>(Option<Rc<RefCell<T>>>);

impl<T> FullPtr<T> {
    pub fn new(value: T) -> Self {
        Self(Some(Rc::new(RefCell::new(value))))
    }

    pub fn null() -> Self {
        Self(None)
    }

    /// A second pointer to the same target
    pub fn alias(&self) -> Self {
        Self(self.0.clone())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Both pointers refer to the same target instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn borrow(&self) -> Option<Ref<'_, T>> {
        self.0.as_ref().map(|target| target.borrow())
    }

    pub fn borrow_mut(&self) -> Option<RefMut<'_, T>> {
        self.0.as_ref().map(|target| target.borrow_mut())
    }
}

impl<T> Default for FullPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for FullPtr<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::null, Self::new)
    }
}

/// A target that is already borrowed, including one being printed further up
/// a cycle, prints as its address.
impl<T: fmt::Debug> fmt::Debug for FullPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("FullPtr(null)"),
            Some(target) => match target.try_borrow_mut() {
                Ok(value) => f.debug_tuple("FullPtr").field(&*value).finish(),
                Err(_) => write!(f, "FullPtr({:p})", Rc::as_ptr(target)),
            },
        }
    }
}

/// Pointers are equal when their targets are, aliasing aside
///
/// Targets are held while they are compared. Reaching two held targets again
/// means both graphs closed the same cycle, which counts as equal.
impl<T: PartialEq> PartialEq for FullPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) if Rc::ptr_eq(a, b) => true,
            (Some(a), Some(b)) => match (a.try_borrow_mut(), b.try_borrow_mut()) {
                (Ok(a), Ok(b)) => *a == *b,
                (Err(_), Err(_)) => true,
                _ => false,
            },
            _ => false,
        }
    }
}

/// Boxed values code exactly like the value they hold
impl<T: NdrCoder + ?Sized> NdrCoder for Box<T> {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        (**self).code(pdu)
    }
}

/// An optional field is an embedded unique pointer
impl<T: NdrCoder + Default> NdrCoder for Option<T> {
    fn code<'v>(&'v mut self, pdu: &mut Pdu<'_, 'v>) -> Result<()> {
        pdu.unique(self)
    }
}

impl<'b, 'v> Pdu<'b, 'v> {
    /// Code a reference pointer to `target`
    ///
    /// Outside any coder this is a top-level parameter: the body is coded in
    /// place followed by all of its pointees.
    ///
    /// The target is owned in place and `[ref]` pointers never alias, so a
    /// decoded referent id that repeats an earlier one is a
    /// [`NdrError::ReferentConflict`]. Aliased targets use [`FullPtr`].
    pub fn reference<T: NdrCoder + 'v>(&mut self, target: &'v mut T) -> Result<()> {
        if self.top_level {
            return self.defer(Deferred::Body {
                referent: None,
                target,
            });
        }

        let offset = self.offset();
        let mut referent = match self.direction {
            Direction::Encode => self.referents.allocate(),
            Direction::Decode => 0,
        };
        self.uint3264(&mut referent)?;
        if self.is_decoding() {
            if referent == 0 {
                return Err(NdrError::DanglingReferent { offset, referent });
            }
            self.referents.claim_inline(referent, offset)?;
        }
        self.defer(Deferred::Body {
            referent: Some(referent),
            target,
        })
    }

    /// Code a unique pointer; `None` is the null pointer
    pub fn unique<T: NdrCoder + Default + 'v>(&mut self, target: &'v mut Option<T>) -> Result<()> {
        let mut referent = if target.is_some() { UNIQUE_REFERENT } else { 0 };
        self.uint3264(&mut referent)?;
        if self.is_decoding() {
            *target = if referent == 0 { None } else { Some(T::default()) };
        }
        let Some(target) = target else {
            return Ok(());
        };
        self.defer(Deferred::Body {
            referent: Some(referent),
            target,
        })
    }

    /// Code a full pointer
    pub fn full<T: NdrCoder + Default + 'static>(&mut self, target: &mut FullPtr<T>) -> Result<()> {
        let offset = self.offset();
        match self.direction {
            Direction::Encode => {
                let Some(shared) = &target.0 else {
                    return self.uint3264(&mut 0);
                };
                let (mut referent, first) = self.referents.identify(shared);
                self.uint3264(&mut referent)?;
                if !first {
                    trace!(referent, offset, "full pointer alias");
                    return Ok(());
                }
                self.queue_shared(SharedBody {
                    referent,
                    depth: self.depth + 1,
                    target: shared.clone(),
                })
            }
            Direction::Decode => {
                let mut referent = 0;
                self.uint3264(&mut referent)?;
                if referent == 0 {
                    target.0 = None;
                    return Ok(());
                }
                if let Some(existing) = self.referents.resolve::<T>(referent, offset)? {
                    trace!(referent, offset, "full pointer alias");
                    target.0 = Some(existing);
                    return Ok(());
                }
                let shared = Rc::new(RefCell::new(T::default()));
                self.referents.record_shared(referent, &shared);
                target.0 = Some(shared.clone());
                self.queue_shared(SharedBody {
                    referent,
                    depth: self.depth + 1,
                    target: shared,
                })
            }
        }
    }

    /// Queue a full pointer target
    ///
    /// Inside a shared session the body is handed back to the enclosing drain
    /// once the current target is released, so chains of full pointers never
    /// nest sessions.
    fn queue_shared(&mut self, body: SharedBody) -> Result<()> {
        if self.depth > 0 {
            trace!(
                referent = body.referent,
                depth = body.depth,
                "postponing shared pointee"
            );
            self.postponed.push(body);
            return Ok(());
        }
        self.defer(Deferred::Shared(body))
    }

    /// Queue a body, or code it now when no coder encloses it
    fn defer(&mut self, entry: Deferred<'v>) -> Result<()> {
        if !self.top_level {
            trace!(referent = ?entry.referent(), offset = self.offset(), "deferring pointee");
            self.deferred.push_back(entry);
            return Ok(());
        }
        self.top_level = false;
        let result = self.run(entry).and_then(|()| self.drain());
        self.top_level = true;
        result
    }

    /// Code every queued body, including the ones they queue in turn
    pub(crate) fn drain(&mut self) -> Result<()> {
        let mut scopes = vec![std::mem::take(&mut self.deferred)];
        while let Some(scope) = scopes.last_mut() {
            let Some(entry) = scope.pop_front() else {
                scopes.pop();
                continue;
            };
            if scope.is_empty() {
                scopes.pop();
            }
            self.run(entry)?;
            let nested = std::mem::take(&mut self.deferred);
            if !nested.is_empty() {
                scopes.push(nested);
            }
        }
        Ok(())
    }

    fn run(&mut self, entry: Deferred<'v>) -> Result<()> {
        let referent = entry.referent();
        trace!(referent = ?referent, offset = self.offset(), "coding pointee");
        let result = match entry {
            Deferred::Body { target, .. } => target.code(self),
            Deferred::Shared(body) => self.run_shared(body),
        };
        match (result, referent) {
            (Err(NdrError::Truncated { offset, .. }), Some(referent)) if self.is_decoding() => {
                Err(NdrError::DanglingReferent { offset, referent })
            }
            (result, _) => result,
        }
    }

    /// Code a shared target in a nested session
    ///
    /// The target is only borrowed while its body runs, so pointees it owns
    /// are drained before the borrow ends. Full pointer targets it reaches
    /// come back postponed and join the current scope's queue.
    fn run_shared(&mut self, shared: SharedBody) -> Result<()> {
        let SharedBody {
            referent,
            depth,
            target,
        } = shared;
        let offset = self.offset();
        if self.is_decoding() && depth > self.config.max_depth {
            return Err(NdrError::NestingTooDeep {
                offset,
                limit: self.config.max_depth,
            });
        }
        let mut body = target
            .try_borrow_mut()
            .map_err(|_| NdrError::ReferentConflict { offset, referent })?;

        let mut nested = Pdu {
            direction: self.direction,
            config: self.config,
            cursor: std::mem::replace(&mut self.cursor, ByteCursor::input(&[])),
            referents: std::mem::take(&mut self.referents),
            deferred: VecDeque::new(),
            postponed: Vec::new(),
            depth,
            top_level: false,
        };
        let result = body.code(&mut nested).and_then(|()| nested.drain());
        self.cursor = nested.cursor;
        self.referents = nested.referents;
        self.deferred.extend(nested.postponed.into_iter().map(Deferred::Shared));
        result
    }
}
