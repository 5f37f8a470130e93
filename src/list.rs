use std::fmt;

use crate::{
    apply::{DeleteOptions, Reconciler},
    filter::Filter,
    transform::Transformer,
    Error, Resource, Result,
};

#[derive(Clone)]
enum Inner {
    Empty,
    Bound {
        resources: Vec<Resource>,
        reconciler: Reconciler,
    },
}

/// Ordered set of resources bound to a cluster connection
///
/// Lists are values: filter, transform and append return new lists holding
/// their own copies of the resources and leave the receiver untouched.
#[derive(Clone)]
pub struct List {
    inner: Inner,
}

impl List {
    /// List which is bound to nothing, every operation on it is a no-op
    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    pub(crate) fn bound(resources: Vec<Resource>, reconciler: Reconciler) -> Self {
        Self {
            inner: Inner::Bound {
                resources,
                reconciler,
            },
        }
    }

    /// Whether this is the unbound [`List::empty`] list
    pub fn is_unbound(&self) -> bool {
        matches!(self.inner, Inner::Empty)
    }

    pub fn resources(&self) -> &[Resource] {
        match &self.inner {
            Inner::Empty => &[],
            Inner::Bound { resources, .. } => resources,
        }
    }

    pub fn size(&self) -> usize {
        self.resources().len()
    }

    fn with_resources(&self, resources: Vec<Resource>) -> Self {
        match &self.inner {
            Inner::Empty => Self::empty(),
            Inner::Bound { reconciler, .. } => Self::bound(resources, reconciler.clone()),
        }
    }

    /// Resources matched by at least one filter, in list order
    pub fn filter(&self, filters: &[Filter]) -> List {
        let resources = self
            .resources()
            .iter()
            .filter(|r| filters.iter().any(|f| f(*r)))
            .cloned()
            .collect();
        self.with_resources(resources)
    }

    /// Copies of all resources with every transformer applied in order
    pub fn transform(&self, transformers: &[Transformer]) -> Result<List> {
        let mut resources = Vec::with_capacity(self.size());
        for resource in self.resources() {
            let mut resource = resource.clone();
            for transformer in transformers {
                transformer(&mut resource).map_err(Error::Transform)?;
            }
            resources.push(resource);
        }
        Ok(self.with_resources(resources))
    }

    /// Own resources followed by the resources of every other list
    ///
    /// The result is bound like this list, or like the first bound list in
    /// `others` when this one is [`List::empty`].
    pub fn append(&self, others: &[&List]) -> List {
        let reconciler = match &self.inner {
            Inner::Bound { reconciler, .. } => Some(reconciler),
            Inner::Empty => others.iter().find_map(|l| match &l.inner {
                Inner::Bound { reconciler, .. } => Some(reconciler),
                Inner::Empty => None,
            }),
        };
        let Some(reconciler) = reconciler else {
            return Self::empty();
        };
        let resources = self
            .resources()
            .iter()
            .chain(others.iter().flat_map(|l| l.resources()))
            .cloned()
            .collect();
        Self::bound(resources, reconciler.clone())
    }

    /// Server-side apply every resource in order, stopping at the first failure
    pub async fn apply(&self) -> Result<()> {
        let Inner::Bound {
            resources,
            reconciler,
        } = &self.inner
        else {
            return Ok(());
        };
        for resource in resources {
            reconciler.apply(resource).await?;
        }
        Ok(())
    }

    /// Delete every resource in order, stopping at the first failure
    pub async fn delete(&self, options: &DeleteOptions) -> Result<()> {
        let Inner::Bound {
            resources,
            reconciler,
        } = &self.inner
        else {
            return Ok(());
        };
        for resource in resources {
            reconciler.delete(resource, options).await?;
        }
        Ok(())
    }
}

impl Default for List {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("unbound", &self.is_unbound())
            .field("resources", &self.resources())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        filter::{by_kind, by_labels, by_name},
        mock_tests::{configmap, FakeCluster},
        transform::{set_labels, set_namespace},
    };
    use serde_json::json;

    fn names(list: &List) -> Vec<&str> {
        list.resources().iter().map(|r| r.name()).collect()
    }

    fn list(cluster: &FakeCluster, names: &[&str]) -> List {
        List::bound(
            names
                .iter()
                .map(|n| configmap(n, "default", json!({"name": n})))
                .collect(),
            cluster.reconciler("test"),
        )
    }

    #[test]
    fn empty_list_short_circuits() {
        let empty = List::empty();
        assert!(empty.is_unbound());
        assert_eq!(empty.size(), 0);
        assert!(empty.filter(&[by_kind("ConfigMap")]).is_unbound());
        assert!(empty.transform(&[set_namespace("x")]).unwrap().is_unbound());
        assert!(empty.append(&[]).is_unbound());
        assert!(empty.append(&[&List::empty()]).is_unbound());
    }

    #[tokio::test]
    async fn empty_list_never_calls_cluster() {
        List::empty().apply().await.unwrap();
        List::empty()
            .delete(&DeleteOptions::wait_for_delete())
            .await
            .unwrap();
    }

    #[test]
    fn filter_keeps_each_resource_once() {
        let cluster = FakeCluster::new();
        let list = list(&cluster, &["a", "b", "c"]);

        let filtered = list.filter(&[by_name("a"), by_kind("ConfigMap"), by_name("c")]);
        assert_eq!(names(&filtered), vec!["a", "b", "c"]);

        let none = list.filter(&[]);
        assert_eq!(none.size(), 0);
        assert!(!none.is_unbound());
    }

    #[test]
    fn filter_by_labels_is_or() {
        let cluster = FakeCluster::new();
        let list = list(&cluster, &["a", "b", "c"])
            .transform(&[set_labels([("app", "demo")])])
            .unwrap();
        let mut b = list.resources()[1].clone();
        b.set_label("tier", "db").unwrap();
        let list = List::empty().append(&[&list.filter(&[by_name("a")]), &list.with_resources(vec![b])]);

        let filtered = list.filter(&[by_labels([("app", "other"), ("tier", "db")])]);
        assert_eq!(names(&filtered), vec!["b"]);
    }

    #[test]
    fn transform_does_not_touch_receiver() {
        let cluster = FakeCluster::new();
        let list = list(&cluster, &["a", "b"]);
        let moved = list.transform(&[set_namespace("prod")]).unwrap();

        assert!(moved.resources().iter().all(|r| r.namespace() == "prod"));
        assert!(list.resources().iter().all(|r| r.namespace() == "default"));
    }

    #[test]
    fn transform_error_aborts() {
        let cluster = FakeCluster::new();
        let list = list(&cluster, &["a", "b"]);
        let failing: Transformer = Box::new(|r: &mut Resource| -> anyhow::Result<()> {
            if r.name() == "b" {
                anyhow::bail!("cannot transform {}", r.name());
            }
            r.set_label("seen", "yes")?;
            Ok(())
        });

        let err = list.transform(&[failing]).unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
        assert!(list.resources()[0].labels().is_empty());
    }

    #[test]
    fn append_order_and_binding() {
        let cluster = FakeCluster::new();
        let a = list(&cluster, &["a1", "a2"]);
        let b = list(&cluster, &["b1"]);
        let c = list(&cluster, &["c1", "c2"]);

        let all = a.append(&[&b, &List::empty(), &c]);
        assert_eq!(names(&all), vec!["a1", "a2", "b1", "c1", "c2"]);
        assert_eq!(a.size(), 2);

        let from_empty = List::empty().append(&[&List::empty(), &b, &c]);
        assert!(!from_empty.is_unbound());
        assert_eq!(names(&from_empty), vec!["b1", "c1", "c2"]);
    }

    #[tokio::test]
    async fn apply_then_delete() {
        let cluster = FakeCluster::new();
        let list = list(&cluster, &["a", "b"]);

        list.apply().await.unwrap();
        assert_eq!(cluster.objects().len(), 2);
        list.apply().await.unwrap();
        assert_eq!(cluster.objects().len(), 2);

        list.delete(&DeleteOptions::default()).await.unwrap();
        assert!(cluster.objects().is_empty());
        // deleting again is not an error
        list.delete(&DeleteOptions::wait_for_delete()).await.unwrap();
    }

    #[tokio::test]
    async fn apply_stops_at_first_failure() {
        let cluster = FakeCluster::new();
        let widget = Resource::try_from(json!({
            "apiVersion": "example.com/v1",
            "kind": "Widget",
            "metadata": {"name": "w", "namespace": "default"},
        }))
        .unwrap();
        let head = list(&cluster, &["a"]);
        let tail = list(&cluster, &["c"]);
        let list = head.append(&[&head.with_resources(vec![widget]), &tail]);

        let err = list.apply().await.unwrap_err();
        assert!(matches!(err, Error::Mapping { .. }));
        let applied: Vec<_> = cluster
            .objects()
            .iter()
            .map(|o| o["metadata"]["name"].clone())
            .collect();
        assert_eq!(applied, vec![json!("a")]);
    }
}
