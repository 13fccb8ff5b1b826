use std::collections::{BTreeSet, HashMap};

use crate::{
    ClassHandle, JdwpError, JdwpValue, MethodId, ObjectId, ReferenceTypeId, RemoteCallGateway,
    RemoteClassResolver, Result, ThreadId, TAG_ARRAY, TAG_STRING,
};

/// One recorded call against [`MockJdwpClient`].
#[derive(Clone, Debug, PartialEq)]
pub enum MockCall {
    FindClass { name: String },
    FindMethod { class: String, name: String },
    NewArray { class: String, length: usize },
    SetArrayValues { array: ObjectId, values: Vec<JdwpValue> },
    InvokeStatic { class: String, method: MethodId, args: Vec<JdwpValue> },
    StringValue(ObjectId),
    DisableCollection(ObjectId),
    EnableCollection(ObjectId),
    InvokeToString(ObjectId),
}

/// Operations that can be told to fail via [`MockJdwpClient::fail`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockOp {
    FindClass,
    FindMethod,
    NewArray,
    SetArrayValues,
    InvokeStatic,
    StringValue,
    DisableCollection,
}

/// What the mock batch helper hands back from a static invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum MockReturn {
    /// A fresh `java.lang.String` holding this text.
    Text(String),
    /// An arbitrary value, returned as-is.
    Value(JdwpValue),
    /// A string object that is collected before it can be pinned.
    Collected,
}

type BatchHandler = Box<dyn FnMut(&[JdwpValue]) -> Result<MockReturn> + Send>;

/// Deterministic, in-memory debuggee test double.
pub struct MockJdwpClient {
    classes: HashMap<String, ReferenceTypeId>,
    methods: HashMap<(ReferenceTypeId, String, String), MethodId>,
    strings: HashMap<ObjectId, String>,
    arrays: HashMap<ObjectId, Vec<JdwpValue>>,
    to_string: HashMap<ObjectId, Result<String>>,
    collected: BTreeSet<ObjectId>,
    collection_disabled: BTreeSet<ObjectId>,
    failures: HashMap<MockOp, JdwpError>,
    batch_handler: Option<BatchHandler>,
    next_id: u64,
    calls: Vec<MockCall>,
}

impl Default for MockJdwpClient {
    fn default() -> Self {
        Self {
            classes: HashMap::new(),
            methods: HashMap::new(),
            strings: HashMap::new(),
            arrays: HashMap::new(),
            to_string: HashMap::new(),
            collected: BTreeSet::new(),
            collection_disabled: BTreeSet::new(),
            failures: HashMap::new(),
            batch_handler: None,
            // Keep mock-allocated ids clear of the small ids tests pick by hand.
            next_id: 10_000,
            calls: Vec::new(),
        }
    }
}

impl MockJdwpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_class(&mut self, name: impl Into<String>) -> ReferenceTypeId {
        let name = name.into();
        if let Some(id) = self.classes.get(&name) {
            return *id;
        }
        let id = self.alloc_id();
        self.classes.insert(name, id);
        id
    }

    pub fn define_method(
        &mut self,
        class: &str,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> MethodId {
        let class_id = self.define_class(class);
        let id = self.alloc_id();
        self.methods
            .insert((class_id, name.into(), signature.into()), id);
        id
    }

    /// Register the `toString()` outcome for an object.
    pub fn set_to_string(&mut self, object: ObjectId, result: Result<String>) {
        self.to_string.insert(object, result);
    }

    pub fn set_batch_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&[JdwpValue]) -> Result<MockReturn> + Send + 'static,
    {
        self.batch_handler = Some(Box::new(handler));
    }

    pub fn fail(&mut self, op: MockOp, err: JdwpError) {
        self.failures.insert(op, err);
    }

    pub fn calls(&self) -> &[MockCall] {
        &self.calls
    }

    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    pub fn is_collection_disabled(&self, object: ObjectId) -> bool {
        self.collection_disabled.contains(&object)
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, op: MockOp) -> Result<()> {
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl RemoteClassResolver for MockJdwpClient {
    fn find_class(
        &mut self,
        _thread: ThreadId,
        name: &str,
        _class_loader: Option<ObjectId>,
    ) -> Result<ClassHandle> {
        self.calls.push(MockCall::FindClass {
            name: name.to_string(),
        });
        self.check(MockOp::FindClass)?;
        match self.classes.get(name) {
            Some(id) => Ok(ClassHandle {
                id: *id,
                name: name.to_string(),
            }),
            None => Err(JdwpError::ClassNotLoaded(name.to_string())),
        }
    }

    fn find_method(
        &mut self,
        class: &ClassHandle,
        name: &str,
        signature: &str,
    ) -> Result<Option<MethodId>> {
        self.calls.push(MockCall::FindMethod {
            class: class.name.clone(),
            name: name.to_string(),
        });
        self.check(MockOp::FindMethod)?;
        Ok(self
            .methods
            .get(&(class.id, name.to_string(), signature.to_string()))
            .copied())
    }
}

impl RemoteCallGateway for MockJdwpClient {
    fn new_array(&mut self, array_type: &ClassHandle, length: usize) -> Result<ObjectId> {
        self.calls.push(MockCall::NewArray {
            class: array_type.name.clone(),
            length,
        });
        self.check(MockOp::NewArray)?;
        let id = self.alloc_id();
        self.arrays.insert(id, vec![JdwpValue::Null; length]);
        Ok(id)
    }

    fn set_array_values(&mut self, array: ObjectId, values: &[JdwpValue]) -> Result<()> {
        self.calls.push(MockCall::SetArrayValues {
            array,
            values: values.to_vec(),
        });
        self.check(MockOp::SetArrayValues)?;
        let slots = self
            .arrays
            .get_mut(&array)
            .ok_or(JdwpError::ObjectCollected(array))?;
        if values.len() > slots.len() {
            return Err(JdwpError::InvalidType(format!(
                "{} values do not fit an array of length {}",
                values.len(),
                slots.len()
            )));
        }
        if let Some(bad) = values
            .iter()
            .find(|v| !matches!(v, JdwpValue::Null | JdwpValue::Object { .. }))
        {
            return Err(JdwpError::InvalidType(format!(
                "{bad:?} is not assignable to java.lang.Object"
            )));
        }
        slots[..values.len()].clone_from_slice(values);
        Ok(())
    }

    fn invoke_static(
        &mut self,
        _thread: ThreadId,
        class: &ClassHandle,
        method: MethodId,
        args: &[JdwpValue],
    ) -> Result<JdwpValue> {
        self.calls.push(MockCall::InvokeStatic {
            class: class.name.clone(),
            method,
            args: args.to_vec(),
        });
        self.check(MockOp::InvokeStatic)?;

        let elements = match args {
            [JdwpValue::Object { tag: TAG_ARRAY, id }] => self
                .arrays
                .get(id)
                .cloned()
                .ok_or(JdwpError::ObjectCollected(*id))?,
            _ => {
                return Err(JdwpError::InvalidType(
                    "expected a single array argument".to_string(),
                ))
            }
        };

        let handler = self
            .batch_handler
            .as_mut()
            .ok_or_else(|| JdwpError::Evaluation("no mock batch handler".to_string()))?;
        match (*handler)(&elements)? {
            MockReturn::Text(text) => {
                let id = self.alloc_id();
                self.strings.insert(id, text);
                Ok(JdwpValue::Object {
                    tag: TAG_STRING,
                    id,
                })
            }
            MockReturn::Value(value) => Ok(value),
            MockReturn::Collected => {
                let id = self.alloc_id();
                self.collected.insert(id);
                Ok(JdwpValue::Object {
                    tag: TAG_STRING,
                    id,
                })
            }
        }
    }

    fn string_value(&mut self, string: ObjectId) -> Result<String> {
        self.calls.push(MockCall::StringValue(string));
        self.check(MockOp::StringValue)?;
        self.strings
            .get(&string)
            .cloned()
            .ok_or(JdwpError::ObjectCollected(string))
    }

    fn disable_collection(&mut self, object: ObjectId) -> Result<()> {
        self.calls.push(MockCall::DisableCollection(object));
        self.check(MockOp::DisableCollection)?;
        if self.collected.contains(&object) {
            return Err(JdwpError::ObjectCollected(object));
        }
        self.collection_disabled.insert(object);
        Ok(())
    }

    fn enable_collection(&mut self, object: ObjectId) -> Result<()> {
        self.calls.push(MockCall::EnableCollection(object));
        self.collection_disabled.remove(&object);
        Ok(())
    }

    fn invoke_to_string(&mut self, _thread: ThreadId, object: ObjectId) -> Result<String> {
        self.calls.push(MockCall::InvokeToString(object));
        match self.to_string.get(&object) {
            Some(result) => result.clone(),
            None => Err(JdwpError::ObjectCollected(object)),
        }
    }
}
