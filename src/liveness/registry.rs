/// Unordered collection of the active entities of one kind. The registry is their sole
///  owner: removing an entry hands it back to the caller, dropping it destroys it.
///
/// Lookup is a linear scan by predicate. The number of entries is the number of peers a node
///  heartbeats with, which is small.
pub struct Registry<T> {
    entries: Vec<T>,
}

impl <T> Default for Registry<T> {
    fn default() -> Self {
        Registry {
            entries: Vec::new(),
        }
    }
}

impl <T> Registry<T> {
    /// Fails without side effects if there is no memory for the new entry.
    pub fn add(&mut self, entry: T) -> anyhow::Result<()> {
        self.entries.try_reserve(1)?;
        self.entries.push(entry);
        Ok(())
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.entries.iter().find(|&e| pred(e))
    }

    pub fn find_mut(&mut self, pred: impl Fn(&T) -> bool) -> Option<&mut T> {
        self.entries.iter_mut().find(|e| pred(&**e))
    }

    pub fn contains(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.find(pred).is_some()
    }

    /// removes the first entry matching the predicate. This changes the order of the
    ///  remaining entries.
    pub fn remove_first(&mut self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let idx = self.entries.iter().position(|e| pred(e))?;
        Some(self.entries.swap_remove(idx))
    }

    /// Removes all entries. Entries are taken out of the registry before the caller sees
    ///  them, so dropping them one by one does not interact with the registry.
    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
