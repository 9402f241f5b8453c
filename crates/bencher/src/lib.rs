/// One benchmark input: a request body and the parameter read out of it.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
    key: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile, key: &'static str) -> Self {
        Self { name, group, file, key }
    }

    pub fn small(name: &'static str, file: TestFile, key: &'static str) -> Self {
        Self::new(name, TestGroup::Small, file, key)
    }

    pub fn large(name: &'static str, file: TestFile, key: &'static str) -> Self {
        Self::new(name, TestGroup::Large, file, key)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn key(&self) -> &'static str {
        self.key
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
    content_type: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str, content_type: &'static str) -> Self {
        Self { file_name, content, content_type }
    }

    pub const fn form(file_name: &'static str, content: &'static str) -> Self {
        Self::new(file_name, content, "application/x-www-form-urlencoded")
    }

    pub const fn json(file_name: &'static str, content: &'static str) -> Self {
        Self::new(file_name, content, "application/json")
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}
