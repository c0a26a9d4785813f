use super::{TargetError, MAX_ATTACHMENTS};

/// Attachment indices bound for drawing in the open pass.
///
/// A bitmask over at most [`MAX_ATTACHMENTS`] indices; iteration is ascending.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ActiveSet(u8);

const _: () = assert!(MAX_ATTACHMENTS <= u8::BITS as usize);

impl ActiveSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every index in `0..count`.
    pub fn all(count: usize) -> Self {
        debug_assert!(count <= MAX_ATTACHMENTS);
        Self(((1u16 << count) - 1) as u8)
    }

    pub fn contains(self, index: usize) -> bool {
        index < MAX_ATTACHMENTS && self.0 & (1 << index) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    fn insert(&mut self, index: usize) {
        self.0 |= 1 << index;
    }

    fn remove(&mut self, index: usize) {
        self.0 &= !(1 << index);
    }

    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_ATTACHMENTS).filter(move |&i| self.contains(i))
    }
}

/// What a state transition did, so the caller can open or close GPU work.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transition {
    /// Idle -> Drawing.
    Opened,
    /// Drawing stays Drawing with a different active set.
    Rebound,
    /// Drawing -> Idle.
    Closed,
    /// Nothing changed.
    Unchanged,
}

/// Pass state of the utility group.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PassState {
    #[default]
    Idle,
    Drawing(ActiveSet),
}

impl PassState {
    pub fn is_drawing(&self) -> bool {
        matches!(self, Self::Drawing(_))
    }

    /// Active indices; empty while idle.
    pub fn active(&self) -> ActiveSet {
        match *self {
            Self::Idle => ActiveSet::empty(),
            Self::Drawing(set) => set,
        }
    }

    /// Opens a pass with every attachment active.
    pub fn begin_all(&mut self, count: usize) -> Result<Transition, TargetError> {
        if self.is_drawing() {
            return Err(TargetError::PassAlreadyOpen);
        }
        *self = Self::Drawing(ActiveSet::all(count));
        Ok(Transition::Opened)
    }

    /// Adds `index` to the active set, opening a pass if idle.
    pub fn begin(&mut self, index: usize, count: usize) -> Result<Transition, TargetError> {
        check_index(index, count)?;
        match self {
            Self::Drawing(set) if set.contains(index) => {
                Err(TargetError::AttachmentAlreadyActive { index })
            }
            Self::Drawing(set) => {
                set.insert(index);
                Ok(Transition::Rebound)
            }
            Self::Idle => {
                let mut set = ActiveSet::empty();
                set.insert(index);
                *self = Self::Drawing(set);
                Ok(Transition::Opened)
            }
        }
    }

    /// Closes the pass whatever its active set; idempotent while idle.
    pub fn end_all(&mut self) -> Transition {
        match std::mem::take(self) {
            Self::Drawing(_) => Transition::Closed,
            Self::Idle => Transition::Unchanged,
        }
    }

    /// Removes `index`; the pass closes once the active set is empty.
    ///
    /// An in-range index that is not active leaves the state unchanged.
    pub fn end(&mut self, index: usize, count: usize) -> Result<Transition, TargetError> {
        check_index(index, count)?;
        let Self::Drawing(set) = self else {
            return Ok(Transition::Unchanged);
        };
        if !set.contains(index) {
            return Ok(Transition::Unchanged);
        }

        set.remove(index);
        if set.is_empty() {
            *self = Self::Idle;
            Ok(Transition::Closed)
        } else {
            Ok(Transition::Rebound)
        }
    }
}

pub(crate) fn check_index(index: usize, count: usize) -> Result<(), TargetError> {
    if index < count {
        Ok(())
    } else {
        Err(TargetError::InvalidIndex { index, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(state: &PassState) -> Vec<usize> {
        state.active().iter().collect()
    }

    #[test]
    fn all_covers_exactly_count_indices() {
        let set = ActiveSet::all(3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(ActiveSet::all(MAX_ATTACHMENTS).len(), MAX_ATTACHMENTS);
        assert!(ActiveSet::all(0).is_empty());
    }

    #[test]
    fn begin_all_twice_is_rejected() {
        let mut state = PassState::Idle;
        assert_eq!(state.begin_all(4).unwrap(), Transition::Opened);
        assert!(matches!(state.begin_all(4), Err(TargetError::PassAlreadyOpen)));
        assert_eq!(indices(&state), vec![0, 1, 2, 3]);
    }

    #[test]
    fn begin_all_rejected_after_per_index_begin() {
        let mut state = PassState::Idle;
        state.begin(2, 4).unwrap();
        assert!(matches!(state.begin_all(4), Err(TargetError::PassAlreadyOpen)));
        assert_eq!(indices(&state), vec![2]);
    }

    #[test]
    fn begin_index_is_additive() {
        let mut state = PassState::Idle;
        assert_eq!(state.begin(0, 3).unwrap(), Transition::Opened);
        assert_eq!(state.begin(2, 3).unwrap(), Transition::Rebound);
        assert_eq!(indices(&state), vec![0, 2]);
    }

    #[test]
    fn begin_same_index_twice_fails_without_change() {
        let mut state = PassState::Idle;
        state.begin(0, 2).unwrap();
        assert!(matches!(
            state.begin(0, 2),
            Err(TargetError::AttachmentAlreadyActive { index: 0 })
        ));
        assert_eq!(indices(&state), vec![0]);
    }

    #[test]
    fn begin_rejects_out_of_range_index() {
        let mut state = PassState::Idle;
        assert!(matches!(
            state.begin(3, 3),
            Err(TargetError::InvalidIndex { index: 3, count: 3 })
        ));
        assert_eq!(state, PassState::Idle);
    }

    #[test]
    fn per_index_end_closes_when_last_index_leaves() {
        let mut state = PassState::Idle;
        state.begin(0, 2).unwrap();
        state.begin(1, 2).unwrap();

        assert_eq!(state.end(0, 2).unwrap(), Transition::Rebound);
        assert!(state.is_drawing());
        assert_eq!(indices(&state), vec![1]);

        assert_eq!(state.end(1, 2).unwrap(), Transition::Closed);
        assert_eq!(state, PassState::Idle);
    }

    #[test]
    fn per_index_end_of_inactive_index_is_unchanged() {
        let mut state = PassState::Idle;
        state.begin(1, 3).unwrap();
        assert_eq!(state.end(2, 3).unwrap(), Transition::Unchanged);
        assert_eq!(indices(&state), vec![1]);
        assert_eq!(PassState::Idle.end(0, 3).unwrap(), Transition::Unchanged);
    }

    #[test]
    fn per_index_end_rejects_out_of_range_index() {
        let mut state = PassState::Idle;
        state.begin_all(2).unwrap();
        assert!(state.end(5, 2).is_err());
        assert_eq!(indices(&state), vec![0, 1]);
    }

    #[test]
    fn end_all_is_idempotent() {
        let mut state = PassState::Idle;
        state.begin(1, 2).unwrap();
        assert_eq!(state.end_all(), Transition::Closed);
        assert_eq!(state.end_all(), Transition::Unchanged);
        assert!(state.active().is_empty());
    }
}
