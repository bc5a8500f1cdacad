/// Input the session starts with: a Deployment and a PodDisruptionBudget whose
/// selector matches nothing, so the engine has something to say about both.
pub const EXAMPLE_INPUT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: statefulset-test-1
spec:
  template:
    metadata:
      labels:
        app: foo
    spec:
      containers:
      - name: foobar
        image: foo:bar
---
apiVersion: policy/v1beta1
kind: PodDisruptionBudget
metadata:
  name: app-budget
spec:
  minAvailable: 2
  selector:
    matchLabels:
      app: not-foo"#;
