//! Topic trie implementation
//!
//! Nodes live in an arena and refer to each other by index. The root is
//! slot 0, always exists, and represents the empty topic.
//!
//! Structural edits (split on subscribe, prune/merge on unsubscribe) allocate
//! any new node before touching the existing one, so a node reachable from
//! the root is never observed half-edited.

use smallvec::SmallVec;

use super::node::{Children, Node, NodeId, PREFIX_MAX};
use super::subscribers::SubscriberSet;
use crate::pipe::PipeId;

const ROOT: NodeId = 0;

/// Result of [`TopicTrie::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscribed {
    /// First subscription to end at this topic
    Inserted,
    /// The topic was already subscribed; its refcount went up
    AlreadyPresent,
}

/// Result of [`TopicTrie::unsubscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsubscribed {
    /// Last subscription to the topic is gone
    Removed,
    /// Other subscriptions to the topic remain
    StillPresent,
    /// No such subscription for this pipe
    NotFound,
}

/// Refcounted patricia trie mapping topics to subscriber sets
#[derive(Debug)]
pub struct TopicTrie {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    /// Nodes with a non-zero refcount
    topics: usize,
}

impl TopicTrie {
    /// Create a trie holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::default())],
            free: Vec::new(),
            topics: 0,
        }
    }

    /// Number of distinct subscribed topics
    pub fn topic_count(&self) -> usize {
        self.topics
    }

    /// Whether no topic is subscribed
    pub fn is_empty(&self) -> bool {
        self.topics == 0
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Subscribe `pipe` to `topic`
    pub fn subscribe(&mut self, pipe: PipeId, topic: &[u8]) -> Subscribed {
        let mut parent = None;
        let mut id = ROOT;
        let mut pos = 0;

        loop {
            let prefix = &self.node(id).prefix;
            let common = common_len(prefix, &topic[pos..]);
            if common < prefix.len() {
                self.split(id, common);
                if let Some(up) = parent {
                    if self.rejoin(up) {
                        id = up;
                    }
                }
            }
            pos += common;

            if pos == topic.len() {
                break;
            }

            match self.node(id).children.get(topic[pos]) {
                Some(child) => {
                    parent = Some(id);
                    id = child;
                    pos += 1;
                }
                None => {
                    id = self.grow(id, &topic[pos..]);
                    break;
                }
            }
        }

        let node = self.node_mut(id);
        node.refcount += 1;
        node.subscribers.add(pipe);

        if node.refcount == 1 {
            self.topics += 1;
            Subscribed::Inserted
        } else {
            Subscribed::AlreadyPresent
        }
    }

    /// Remove one subscription of `pipe` to `topic`
    ///
    /// Never creates or splits nodes. A pipe that does not hold the
    /// subscription gets `NotFound` and nothing changes.
    pub fn unsubscribe(&mut self, pipe: PipeId, topic: &[u8]) -> Unsubscribed {
        let Some((id, path)) = self.find(topic) else {
            return Unsubscribed::NotFound;
        };

        let node = self.node_mut(id);
        if node.refcount == 0 || !node.subscribers.remove(pipe) {
            return Unsubscribed::NotFound;
        }
        node.refcount -= 1;
        if node.refcount > 0 {
            return Unsubscribed::StillPresent;
        }

        self.topics -= 1;
        self.prune(id, path);
        Unsubscribed::Removed
    }

    /// Subscriber set of the longest subscribed topic that prefixes `topic`
    pub fn match_topic(&self, topic: &[u8]) -> Option<&SubscriberSet> {
        self.match_all(topic).last()
    }

    /// Subscriber sets of every subscribed topic that prefixes `topic`,
    /// shortest first
    pub fn match_all<'a, 'q>(&'a self, topic: &'q [u8]) -> Matches<'a, 'q> {
        Matches {
            trie: self,
            topic,
            pos: 0,
            next: Some(ROOT),
        }
    }

    /// Whether `pipe` holds a subscription to exactly `topic`
    pub fn contains(&self, pipe: PipeId, topic: &[u8]) -> bool {
        self.find(topic)
            .map(|(id, _)| {
                let node = self.node(id);
                node.refcount > 0 && node.subscribers.contains(pipe)
            })
            .unwrap_or(false)
    }

    /// Every subscribed topic with its refcount, in byte order
    pub fn topics(&self) -> Vec<(Vec<u8>, u32)> {
        let mut out = Vec::with_capacity(self.topics);
        let mut stack = vec![(ROOT, Vec::new())];

        while let Some((id, mut path)) = stack.pop() {
            let node = self.node(id);
            path.extend_from_slice(&node.prefix);
            if node.refcount > 0 {
                out.push((path.clone(), node.refcount));
            }
            for (byte, child) in node.children.entries().into_iter().rev() {
                let mut child_path = path.clone();
                child_path.push(byte);
                stack.push((child, child_path));
            }
        }

        out
    }

    /// Walk to the node representing exactly `topic`, recording
    /// `(parent, branch byte)` for each step
    fn find(&self, topic: &[u8]) -> Option<(NodeId, Vec<(NodeId, u8)>)> {
        let mut id = ROOT;
        let mut pos = 0;
        let mut path = Vec::new();

        loop {
            let node = self.node(id);
            if !topic[pos..].starts_with(&node.prefix) {
                return None;
            }
            pos += node.prefix.len();

            if pos == topic.len() {
                return Some((id, path));
            }

            let byte = topic[pos];
            let child = node.children.get(byte)?;
            path.push((id, byte));
            id = child;
            pos += 1;
        }
    }

    /// Split `id` so that it keeps only the first `at` prefix bytes; the rest
    /// of the prefix, the refcount, the children and the subscribers move to
    /// a new child node.
    fn split(&mut self, id: NodeId, at: usize) {
        let tail_id = self.alloc(Node::default());

        let node = self.node_mut(id);
        let branch = node.prefix[at];
        let tail = Node {
            prefix: SmallVec::from_slice(&node.prefix[at + 1..]),
            refcount: node.refcount,
            children: std::mem::take(&mut node.children),
            subscribers: std::mem::take(&mut node.subscribers),
        };
        node.prefix.truncate(at);
        node.refcount = 0;
        node.children = Children::single(branch, tail_id);

        let rejoin_tail = tail.refcount == 0;
        *self.node_mut(tail_id) = tail;
        tracing::trace!(node = id, tail = tail_id, at, "Split trie node");

        // A shorter tail may now fit together with its only child
        if rejoin_tail {
            self.merge_with_child(tail_id);
        }
    }

    /// Fold the only child of `id` back into it after a split shortened
    /// that child; returns whether the merge happened
    fn rejoin(&mut self, id: NodeId) -> bool {
        id != ROOT && self.node(id).refcount == 0 && self.merge_with_child(id)
    }

    /// Hang a chain of new nodes spelling `suffix` under `parent` and return
    /// the last one
    fn grow(&mut self, parent: NodeId, suffix: &[u8]) -> NodeId {
        let mut parent = parent;
        let mut rest = suffix;

        while let Some((&branch, after)) = rest.split_first() {
            let take = after.len().min(PREFIX_MAX);
            let child = self.alloc(Node::with_prefix(&after[..take]));
            self.node_mut(parent).children.insert(branch, child);
            parent = child;
            rest = &after[take..];
        }

        parent
    }

    /// Restore minimality after `id` lost its last subscription
    fn prune(&mut self, id: NodeId, mut path: Vec<(NodeId, u8)>) {
        let mut id = id;

        while id != ROOT {
            let node = self.node(id);
            if node.refcount > 0 {
                return;
            }

            match node.children.len() {
                0 => {
                    let Some((parent, branch)) = path.pop() else {
                        unreachable!("non-root trie node without a parent");
                    };
                    let removed = self.node_mut(parent).children.remove(branch);
                    assert_eq!(removed, Some(id), "trie parent/child link mismatch");
                    self.release(id);
                    id = parent;
                }
                1 => {
                    self.merge_with_child(id);
                    return;
                }
                _ => return,
            }
        }
    }

    /// Fold the only child of `id` into `id` when the joined prefix fits
    fn merge_with_child(&mut self, id: NodeId) -> bool {
        let node = self.node(id);
        let Some((branch, child_id)) = node.children.only_child() else {
            return false;
        };
        if node.prefix.len() + 1 + self.node(child_id).prefix.len() > PREFIX_MAX {
            return false;
        }
        debug_assert!(node.refcount == 0 && node.subscribers.is_empty());

        let child = self.release(child_id);
        let node = self.node_mut(id);
        node.prefix.push(branch);
        node.prefix.extend_from_slice(&child.prefix);
        node.refcount = child.refcount;
        node.children = child.children;
        node.subscribers = child.subscribers;

        tracing::trace!(node = id, child = child_id, "Merged trie node with its child");
        true
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node {
        assert_ne!(id, ROOT, "the trie root is never released");
        let node = self.nodes[id]
            .take()
            .unwrap_or_else(|| panic!("trie node {} released twice", id));
        self.free.push(id);
        node
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id]
            .as_ref()
            .unwrap_or_else(|| panic!("trie node {} used after release", id))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id]
            .as_mut()
            .unwrap_or_else(|| panic!("trie node {} used after release", id))
    }
}

impl Default for TopicTrie {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`TopicTrie::match_all`]
pub struct Matches<'a, 'q> {
    trie: &'a TopicTrie,
    topic: &'q [u8],
    pos: usize,
    next: Option<NodeId>,
}

impl<'a, 'q> Iterator for Matches<'a, 'q> {
    type Item = &'a SubscriberSet;

    fn next(&mut self) -> Option<Self::Item> {
        let trie = self.trie;
        loop {
            let node = trie.node(self.next.take()?);
            if !self.topic[self.pos..].starts_with(&node.prefix) {
                return None;
            }
            self.pos += node.prefix.len();

            if let Some(&byte) = self.topic.get(self.pos) {
                if let Some(child) = node.children.get(byte) {
                    self.next = Some(child);
                    self.pos += 1;
                }
            }

            if node.refcount > 0 {
                return Some(&node.subscribers);
            }
        }
    }
}

fn common_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
impl TopicTrie {
    /// Check every structural invariant, panicking on the first violation
    pub(crate) fn assert_invariants(&self) {
        use super::node::SPARSE_MAX;

        let mut reachable = 0;
        let mut topics = 0;
        let mut stack = vec![ROOT];

        while let Some(id) = stack.pop() {
            reachable += 1;
            let node = self.node(id);

            assert!(node.prefix.len() <= PREFIX_MAX, "node {} prefix too long", id);
            assert_eq!(
                node.refcount,
                node.subscribers.total_refs(),
                "node {} refcount does not match its subscribers",
                id
            );
            if node.refcount > 0 {
                topics += 1;
            }

            match &node.children {
                Children::Sparse(entries) => {
                    assert!(entries.len() <= SPARSE_MAX, "node {} sparse overflow", id);
                    assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
                }
                Children::Dense { slots, live, .. } => {
                    assert_eq!(*live, slots.iter().flatten().count());
                    assert!(matches!(slots.first(), Some(Some(_))));
                    assert!(matches!(slots.last(), Some(Some(_))));
                }
            }

            if id == ROOT {
                assert!(node.prefix.is_empty(), "root must represent the empty topic");
            } else if node.refcount == 0 {
                match node.children.only_child() {
                    Some((_, child)) => assert!(
                        node.prefix.len() + 1 + self.node(child).prefix.len() > PREFIX_MAX,
                        "node {} should have been merged with its child",
                        id
                    ),
                    None => assert!(
                        node.children.len() >= 2,
                        "node {} should have been pruned",
                        id
                    ),
                }
            }

            stack.extend(node.children.entries().into_iter().map(|(_, child)| child));
        }

        assert_eq!(reachable, self.node_count(), "unreachable live nodes");
        assert_eq!(topics, self.topics, "topic count out of sync");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    fn pipe(n: u64) -> PipeId {
        PipeId::from_raw(n)
    }

    fn matched(trie: &TopicTrie, topic: &[u8]) -> Vec<PipeId> {
        trie.match_topic(topic)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_subscribe_and_match() {
        let mut trie = TopicTrie::new();

        assert_eq!(trie.subscribe(pipe(1), b"foo"), Subscribed::Inserted);
        assert_eq!(matched(&trie, b"foo"), vec![pipe(1)]);
        assert_eq!(matched(&trie, b"foobar"), vec![pipe(1)]);
        assert!(matched(&trie, b"fo").is_empty());
        assert!(matched(&trie, b"bar").is_empty());
        trie.assert_invariants();
    }

    #[test]
    fn test_match_outlives_query() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), b"foo");

        let set = {
            let query = b"foobar".to_vec();
            trie.match_topic(&query)
        };
        assert_eq!(set.map(SubscriberSet::len), Some(1));
    }

    #[test]
    fn test_repeated_subscription_refcounts() {
        let mut trie = TopicTrie::new();

        assert_eq!(trie.subscribe(pipe(1), b"foo"), Subscribed::Inserted);
        assert_eq!(trie.subscribe(pipe(1), b"foo"), Subscribed::AlreadyPresent);
        assert_eq!(trie.subscribe(pipe(2), b"foo"), Subscribed::AlreadyPresent);
        assert_eq!(trie.topic_count(), 1);
        assert_eq!(trie.topics(), vec![(b"foo".to_vec(), 3)]);

        assert_eq!(trie.unsubscribe(pipe(1), b"foo"), Unsubscribed::StillPresent);
        assert!(trie.contains(pipe(1), b"foo"));
        assert_eq!(trie.unsubscribe(pipe(1), b"foo"), Unsubscribed::StillPresent);
        assert!(!trie.contains(pipe(1), b"foo"));
        assert_eq!(trie.unsubscribe(pipe(2), b"foo"), Unsubscribed::Removed);
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
        trie.assert_invariants();
    }

    #[test]
    fn test_empty_topic_matches_everything() {
        let mut trie = TopicTrie::new();

        assert_eq!(trie.subscribe(pipe(1), b""), Subscribed::Inserted);
        assert_eq!(matched(&trie, b""), vec![pipe(1)]);
        assert_eq!(matched(&trie, b"anything"), vec![pipe(1)]);
        assert_eq!(matched(&trie, &[0x00, 0xff]), vec![pipe(1)]);
        assert_eq!(trie.node_count(), 1);

        assert_eq!(trie.unsubscribe(pipe(1), b""), Unsubscribed::Removed);
        assert!(trie.match_topic(b"anything").is_none());
        trie.assert_invariants();
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), b"");
        trie.subscribe(pipe(2), b"foo");
        trie.subscribe(pipe(3), b"foobar");

        assert_eq!(matched(&trie, b"foobarbaz"), vec![pipe(3)]);
        assert_eq!(matched(&trie, b"foobaz"), vec![pipe(2)]);
        assert_eq!(matched(&trie, b"fo"), vec![pipe(1)]);

        let all: Vec<Vec<PipeId>> = trie
            .match_all(b"foobarbaz")
            .map(|set| set.iter().collect())
            .collect();
        assert_eq!(all, vec![vec![pipe(1)], vec![pipe(2)], vec![pipe(3)]]);
        trie.assert_invariants();
    }

    #[test]
    fn test_split_on_divergence() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), b"abcdef");
        trie.subscribe(pipe(2), b"abxy");
        trie.assert_invariants();

        assert_eq!(matched(&trie, b"abcdefg"), vec![pipe(1)]);
        assert_eq!(matched(&trie, b"abxyz"), vec![pipe(2)]);
        assert!(matched(&trie, b"abc").is_empty());
        assert!(matched(&trie, b"ab").is_empty());

        // root, the shared "ab" branch node, two leaves
        assert_eq!(trie.node_count(), 4);
    }

    #[test]
    fn test_split_where_topic_ends() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), b"foobar");
        assert_eq!(trie.subscribe(pipe(2), b"foo"), Subscribed::Inserted);
        trie.assert_invariants();

        assert_eq!(matched(&trie, b"foob"), vec![pipe(2)]);
        assert_eq!(matched(&trie, b"foobar"), vec![pipe(1)]);

        assert_eq!(trie.unsubscribe(pipe(2), b"foo"), Unsubscribed::Removed);
        trie.assert_invariants();
        // The split is undone
        assert_eq!(trie.node_count(), 2);
        assert_eq!(matched(&trie, b"foobar"), vec![pipe(1)]);
    }

    #[test]
    fn test_long_topics_chain_nodes() {
        let mut trie = TopicTrie::new();
        let long = b"a-rather-long-topic-name-spanning-several-nodes";

        trie.subscribe(pipe(1), long);
        trie.assert_invariants();
        assert!(trie.node_count() > 2);
        assert_eq!(matched(&trie, long), vec![pipe(1)]);
        assert!(matched(&trie, &long[..long.len() - 1]).is_empty());

        trie.subscribe(pipe(2), &long[..20]);
        trie.assert_invariants();
        assert_eq!(matched(&trie, &long[..25]), vec![pipe(2)]);

        assert_eq!(trie.unsubscribe(pipe(1), long), Unsubscribed::Removed);
        trie.assert_invariants();
        assert_eq!(trie.unsubscribe(pipe(2), &long[..20]), Unsubscribed::Removed);
        trie.assert_invariants();
        assert_eq!(trie.node_count(), 1);
    }

    #[test]
    fn test_unsubscribe_not_found() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), b"foobar");

        // Path exists only as an intermediate string
        assert_eq!(trie.unsubscribe(pipe(1), b"foo"), Unsubscribed::NotFound);
        // Path does not exist
        assert_eq!(trie.unsubscribe(pipe(1), b"bar"), Unsubscribed::NotFound);
        // Pipe never subscribed: no state change
        assert_eq!(trie.unsubscribe(pipe(2), b"foobar"), Unsubscribed::NotFound);
        assert_eq!(trie.topics(), vec![(b"foobar".to_vec(), 1)]);
        trie.assert_invariants();
    }

    #[test]
    fn test_wide_fanout_goes_dense_and_back() {
        let mut trie = TopicTrie::new();
        let topics: Vec<Vec<u8>> = (0u8..40).map(|b| vec![b'x', b * 3, b'!']).collect();

        for (n, topic) in topics.iter().enumerate() {
            trie.subscribe(pipe(n as u64), topic);
        }
        trie.assert_invariants();
        for (n, topic) in topics.iter().enumerate() {
            assert_eq!(matched(&trie, topic), vec![pipe(n as u64)]);
        }

        for (n, topic) in topics.iter().enumerate().skip(1) {
            assert_eq!(trie.unsubscribe(pipe(n as u64), topic), Unsubscribed::Removed);
            trie.assert_invariants();
        }
        assert_eq!(matched(&trie, &topics[0]), vec![pipe(0)]);
        assert_eq!(trie.node_count(), 2);
    }

    #[test]
    fn test_binary_topics() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), &[0x00, 0xff, 0x00]);
        trie.subscribe(pipe(2), &[0x00, 0xfe]);

        assert_eq!(matched(&trie, &[0x00, 0xff, 0x00, 0x01]), vec![pipe(1)]);
        assert_eq!(matched(&trie, &[0x00, 0xfe]), vec![pipe(2)]);
        assert!(matched(&trie, &[0x00]).is_empty());
        trie.assert_invariants();
    }

    #[test]
    fn test_paired_operations_leave_no_membership() {
        let mut trie = TopicTrie::new();
        let topics: [&[u8]; 6] = [b"", b"a", b"ab", b"abc", b"abd", b"b-very-long-topic-x"];

        // Interleave two pipes over overlapping topics
        for round in 0..3u64 {
            for topic in topics {
                trie.subscribe(pipe(round % 2), topic);
            }
        }
        trie.assert_invariants();

        for round in 0..3u64 {
            for topic in topics.iter().rev() {
                assert_ne!(
                    trie.unsubscribe(pipe(round % 2), topic),
                    Unsubscribed::NotFound
                );
                trie.assert_invariants();
            }
        }

        for topic in topics {
            assert!(trie.match_topic(topic).is_none());
            assert!(!trie.contains(pipe(0), topic));
            assert!(!trie.contains(pipe(1), topic));
        }
        assert_eq!(trie.node_count(), 1);
    }

    #[test]
    fn test_split_rejoins_shortened_neighbours() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), b"xabcd12345678");
        trie.subscribe(pipe(1), b"xabce");
        trie.assert_invariants();
        trie.subscribe(pipe(1), b"xabcd12345678Q");
        trie.unsubscribe(pipe(1), b"xabcd12345678");
        trie.unsubscribe(pipe(1), b"xabce");
        trie.assert_invariants();

        // Splitting "12345678" leaves a one-byte node that fits back into "abc"
        trie.subscribe(pipe(2), b"xabcd1Z");
        trie.assert_invariants();
        assert_eq!(matched(&trie, b"xabcd12345678Q!"), vec![pipe(1)]);
        assert_eq!(matched(&trie, b"xabcd1Z"), vec![pipe(2)]);
        assert!(matched(&trie, b"xabcd1").is_empty());
    }

    /// Small deterministic generator for the randomized tests
    struct Lcg(u64);

    impl Lcg {
        fn below(&mut self, n: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 33) % n as u64) as usize
        }

        fn topic(&mut self, alphabet: &[u8], max_len: usize) -> Vec<u8> {
            let len = self.below(max_len + 1);
            (0..len).map(|_| alphabet[self.below(alphabet.len())]).collect()
        }
    }

    /// Pipes holding the longest modelled topic that prefixes `query`
    fn model_match(model: &HashMap<(PipeId, Vec<u8>), u32>, query: &[u8]) -> Vec<PipeId> {
        let longest = model
            .keys()
            .filter(|(_, topic)| query.starts_with(topic))
            .map(|(_, topic)| topic.len())
            .max();
        let mut pipes: Vec<PipeId> = model
            .keys()
            .filter(|(_, topic)| Some(topic.len()) == longest && query.starts_with(topic))
            .map(|(pipe, _)| *pipe)
            .collect();
        pipes.sort();
        pipes
    }

    fn run_against_model(seed: u64, alphabet: &[u8], max_len: usize, steps: usize) {
        let mut rng = Lcg(seed);
        let mut trie = TopicTrie::new();
        let mut model: HashMap<(PipeId, Vec<u8>), u32> = HashMap::new();

        for _ in 0..steps {
            let who = pipe(rng.below(4) as u64);
            let held: Vec<(PipeId, Vec<u8>)> = model.keys().cloned().collect();

            if held.is_empty() || rng.below(5) < 3 {
                let topic = rng.topic(alphabet, max_len);
                let fresh = !model.keys().any(|(_, t)| *t == topic);
                let outcome = trie.subscribe(who, &topic);
                assert_eq!(outcome == Subscribed::Inserted, fresh, "subscribe {:?}", topic);
                *model.entry((who, topic)).or_insert(0) += 1;
            } else if rng.below(4) == 0 {
                // Usually a subscription this pipe does not hold
                let topic = rng.topic(alphabet, max_len);
                let outcome = trie.unsubscribe(who, &topic);
                if !model.contains_key(&(who, topic.clone())) {
                    assert_eq!(outcome, Unsubscribed::NotFound, "unsubscribe {:?}", topic);
                } else {
                    assert_ne!(outcome, Unsubscribed::NotFound);
                    let count = model.get_mut(&(who, topic.clone())).unwrap();
                    *count -= 1;
                    if *count == 0 {
                        model.remove(&(who, topic));
                    }
                }
            } else {
                let (owner, topic) = held[rng.below(held.len())].clone();
                let count = model.get_mut(&(owner, topic.clone())).unwrap();
                *count -= 1;
                if *count == 0 {
                    model.remove(&(owner, topic.clone()));
                }
                let remaining = model.keys().any(|(_, t)| *t == topic);
                let expected = if remaining {
                    Unsubscribed::StillPresent
                } else {
                    Unsubscribed::Removed
                };
                assert_eq!(trie.unsubscribe(owner, &topic), expected, "unsubscribe {:?}", topic);
            }

            trie.assert_invariants();

            let distinct: HashSet<&Vec<u8>> = model.keys().map(|(_, t)| t).collect();
            assert_eq!(trie.topic_count(), distinct.len());

            for _ in 0..4 {
                let query = rng.topic(alphabet, max_len + 4);
                let mut got = matched(&trie, &query);
                got.sort();
                assert_eq!(got, model_match(&model, &query), "match {:?}", query);
            }
        }

        // Drain what is left; nothing may linger afterwards
        for ((owner, topic), count) in model.drain() {
            for _ in 0..count {
                assert_ne!(trie.unsubscribe(owner, &topic), Unsubscribed::NotFound);
            }
            trie.assert_invariants();
        }
        assert!(trie.is_empty());
        assert_eq!(trie.node_count(), 1);
        assert!(trie.match_topic(b"").is_none());
    }

    #[test]
    fn test_random_sequences_narrow_alphabet() {
        for seed in 1..=8 {
            run_against_model(seed, b"ab", 20, 800);
        }
    }

    #[test]
    fn test_random_sequences_wide_alphabet() {
        let alphabet: Vec<u8> = (0u8..=255).step_by(7).collect();
        for seed in 1..=8 {
            run_against_model(seed * 7919, &alphabet, 14, 800);
        }
    }

    #[test]
    fn test_arena_slots_are_reused() {
        let mut trie = TopicTrie::new();
        trie.subscribe(pipe(1), b"alpha");
        trie.subscribe(pipe(1), b"beta");
        let peak = trie.nodes.len();

        trie.unsubscribe(pipe(1), b"alpha");
        trie.subscribe(pipe(1), b"gamma");
        assert_eq!(trie.nodes.len(), peak);
        trie.assert_invariants();
    }
}
