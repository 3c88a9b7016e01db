use crate::error::InvariantViolation;

// Ticket handed to a tracked helper; returned on untrack. Generation guards
// against slot reuse, so a stale ticket can never splice out someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DecoderTicket
{
    slot: u32,
    generation: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Untracked
{
    Removed,
    // The tracker released this helper at shutdown; its destiny is the
    // holder's responsibility now, nothing to do
    Leaking,
}

struct SlotEntry
{
    label: String,
    prev: Option<u32>,
    next: Option<u32>,
}

struct Slot
{
    generation: u32,
    entry: Option<SlotEntry>,
}

// Membership list for transient decode helpers owned indirectly by a
// manager. O(1) insert/remove via index links instead of raw prev/next
// pointers; root/tail/count mirror the linkage and are checked on removal.
#[derive(Default)]
pub(crate) struct DecoderTracker
{
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<u32>,
    tail: Option<u32>,
    count: usize,
}
impl DecoderTracker
{
    pub fn track(&mut self, label: String) -> DecoderTicket
    {
        let slot = match self.free.pop()
        {
            Some(i) => i,
            None =>
            {
                self.slots.push(Slot { generation: 0, entry: None });
                (self.slots.len() - 1) as u32
            },
        };

        self.slots[slot as usize].entry = Some(SlotEntry
        {
            label,
            prev: self.tail,
            next: None,
        });

        match self.tail
        {
            Some(tail) => self.entry_mut(tail).next = Some(slot),
            None => self.root = Some(slot),
        }
        self.tail = Some(slot);
        self.count += 1;

        DecoderTicket { slot, generation: self.slots[slot as usize].generation }
    }

    pub fn untrack(&mut self, ticket: DecoderTicket) -> Result<Untracked, InvariantViolation>
    {
        let Some(slot) = self.slots.get(ticket.slot as usize) else { return Ok(Untracked::Leaking); };
        if slot.generation != ticket.generation || slot.entry.is_none()
        {
            return Ok(Untracked::Leaking);
        }

        self.check_linkage(ticket.slot)?;

        let entry = self.slots[ticket.slot as usize].entry.take().unwrap();
        match entry.prev
        {
            Some(prev) => self.entry_mut(prev).next = entry.next,
            None => self.root = entry.next,
        }
        match entry.next
        {
            Some(next) => self.entry_mut(next).prev = entry.prev,
            None => self.tail = entry.prev,
        }

        self.count -= 1;
        self.slots[ticket.slot as usize].generation = self.slots[ticket.slot as usize].generation.wrapping_add(1);
        self.free.push(ticket.slot);
        Ok(Untracked::Removed)
    }

    // Walk the list logging every still-tracked helper, then forget the whole
    // membership. The helpers themselves are not touched: deleting objects
    // whose owners may still use them during engine unwind is the worse bug.
    pub fn release_leaking(&mut self) -> usize
    {
        let mut walk = self.root;
        let mut leaked = 0usize;
        while let Some(i) = walk
        {
            let entry = self.slots[i as usize].entry.as_ref().unwrap();
            log::warn!("Decoder still tracked at shutdown: {}", entry.label);
            leaked += 1;
            walk = entry.next;
        }
        debug_assert_eq!(leaked, self.count);

        for slot in &mut self.slots
        {
            if slot.entry.take().is_some()
            {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free.clear();
        self.free.extend((0..self.slots.len() as u32).rev());
        self.root = None;
        self.tail = None;
        self.count = 0;
        leaked
    }

    #[inline]
    pub fn count(&self) -> usize { self.count }

    fn entry_mut(&mut self, slot: u32) -> &mut SlotEntry
    {
        self.slots[slot as usize].entry.as_mut().unwrap()
    }

    // A slot claiming membership must agree with its neighbors and with
    // root/tail; disagreement means a double-free or corruption upstream
    fn check_linkage(&self, slot: u32) -> Result<(), InvariantViolation>
    {
        if self.count == 0
        {
            return Err(InvariantViolation { detail: "member present in an empty list" });
        }

        let entry = self.slots[slot as usize].entry.as_ref().unwrap();

        let prev_ok = match entry.prev
        {
            Some(prev) => self.slots.get(prev as usize)
                .and_then(|s| s.entry.as_ref())
                .is_some_and(|e| e.next == Some(slot)),
            None => self.root == Some(slot),
        };
        if !prev_ok
        {
            return Err(InvariantViolation { detail: "prev link disagrees with list" });
        }

        let next_ok = match entry.next
        {
            Some(next) => self.slots.get(next as usize)
                .and_then(|s| s.entry.as_ref())
                .is_some_and(|e| e.prev == Some(slot)),
            None => self.tail == Some(slot),
        };
        if !next_ok
        {
            return Err(InvariantViolation { detail: "next link disagrees with list" });
        }

        Ok(())
    }

    // (root == null) == (tail == null) == (count == 0), and walking root via
    // next visits exactly count entries ending at tail
    #[cfg(test)]
    fn is_consistent(&self) -> bool
    {
        if (self.root.is_none() != self.tail.is_none()) || (self.root.is_none() != (self.count == 0))
        {
            return false;
        }

        let mut walk = self.root;
        let mut visited = 0usize;
        let mut last = None;
        while let Some(i) = walk
        {
            let Some(entry) = self.slots[i as usize].entry.as_ref() else { return false; };
            visited += 1;
            if visited > self.count { return false; }
            last = Some(i);
            walk = entry.next;
        }
        visited == self.count && last == self.tail
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn track_untrack_interleavings_stay_consistent()
    {
        let mut tracker = DecoderTracker::default();
        assert!(tracker.is_consistent());

        let a = tracker.track("a".into());
        let b = tracker.track("b".into());
        let c = tracker.track("c".into());
        assert_eq!(3, tracker.count());
        assert!(tracker.is_consistent());

        // middle, tail, root
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(b));
        assert!(tracker.is_consistent());
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(c));
        assert!(tracker.is_consistent());
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(a));
        assert!(tracker.is_consistent());
        assert_eq!(0, tracker.count());

        // slots get reused after removal
        let d = tracker.track("d".into());
        let e = tracker.track("e".into());
        assert_eq!(2, tracker.count());
        assert!(tracker.is_consistent());
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(d));
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(e));
        assert!(tracker.is_consistent());
    }

    #[test]
    fn stale_ticket_is_a_noop()
    {
        let mut tracker = DecoderTracker::default();
        let a = tracker.track("a".into());
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(a));

        // the slot was reused; the old ticket must not touch the new member
        let b = tracker.track("b".into());
        assert_eq!(Ok(Untracked::Leaking), tracker.untrack(a));
        assert_eq!(1, tracker.count());
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(b));
    }

    #[test]
    fn corrupted_linkage_is_an_invariant_violation()
    {
        let mut tracker = DecoderTracker::default();
        let a = tracker.track("a".into());
        let _b = tracker.track("b".into());

        // sever the root designation behind the list's back
        tracker.root = tracker.tail;
        assert!(tracker.untrack(a).is_err());
    }

    #[test]
    fn release_leaking_clears_without_erroring_later_untracks()
    {
        let mut tracker = DecoderTracker::default();
        let a = tracker.track("a".into());
        let _b = tracker.track("b".into());
        let c = tracker.track("c".into());
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(c));

        assert_eq!(2, tracker.release_leaking());
        assert_eq!(0, tracker.count());
        assert!(tracker.is_consistent());

        // helpers released as leaking deregister as no-ops afterwards
        assert_eq!(Ok(Untracked::Leaking), tracker.untrack(a));

        // and the tracker remains usable
        let d = tracker.track("d".into());
        assert_eq!(1, tracker.count());
        assert!(tracker.is_consistent());
        assert_eq!(Ok(Untracked::Removed), tracker.untrack(d));
    }

    #[test]
    fn release_leaking_on_empty_list()
    {
        let mut tracker = DecoderTracker::default();
        assert_eq!(0, tracker.release_leaking());
        assert!(tracker.is_consistent());
    }
}
