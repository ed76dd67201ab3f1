//! LibXML2 FFI Wrapper Module
//!
//! Safe wrappers around the handful of libxml2 calls the schema validator
//! needs: compiling an XSD from memory, parsing an instance document from
//! memory, validating it, and pretty-printing it for normalization.
//!
//! ## Why libxml2
//!
//! The Rust XML crates (`roxmltree`, `quick-xml`, `xml-rs`, `yaserde`) parse
//! XML well but none of them validates against XML Schema. libxml2 is the
//! engine behind `xmllint`, so its messages and its `--format` output are
//! what users of the configuration format already know.
//!
//! ## Memory management
//!
//! Every libxml2 allocation handed to Rust is owned by an RAII wrapper:
//! [`XmlSchemaPtr`] frees the compiled schema when the last clone drops and
//! [`XmlDocPtr`] frees the parsed document. Buffers returned by the
//! serializer are copied into a `String` and released immediately.
//!
//! ## Thread safety
//!
//! - Initialization happens exactly once behind [`std::sync::Once`].
//! - Schema *parsing* is not thread-safe in libxml2 and is serialized through
//!   a process-wide lock.
//! - Validation uses a fresh validation context per call, so compiled schemas
//!   can be shared across threads.
//! - Error capture goes through structured error callbacks whose user data
//!   is a `Vec` owned by the calling stack frame; the global handler used
//!   while parsing documents is thread-local in threaded libxml2 builds and
//!   is always reset before returning.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Once};

use libc::{c_char, c_int, c_void};
use serde::{Deserialize, Serialize};

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2
static LIBXML2_INIT: Once = Once::new();

/// Serializes schema compilation
static SCHEMA_PARSE_LOCK: Mutex<()> = Mutex::new(());

/// `XML_PARSE_NOBLANKS`: drop ignorable whitespace so the serializer can re-indent
const XML_PARSE_NOBLANKS: c_int = 1 << 8;
/// `XML_PARSE_NONET`: never fetch external resources
const XML_PARSE_NONET: c_int = 1 << 11;
/// `XML_ERR_ERROR`; warnings are below it
const XML_ERR_ERROR: c_int = 2;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut XmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();

    // Schema compilation
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *mut XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *mut XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;

    // Document parsing and serialization
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlDocDumpFormatMemoryEnc(
        doc: *mut XmlDoc,
        doc_txt_ptr: *mut *mut u8,
        doc_txt_len: *mut c_int,
        txt_encoding: *const c_char,
        format: c_int,
    );

    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);
}

/// An error reported by libxml2 with its position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    /// 1-based line, when libxml2 knows it
    pub line: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Collects errors and fatal errors into the `Vec<StructuredError>` behind `user_data`
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut XmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }

    let errors = unsafe { &mut *(user_data as *mut Vec<StructuredError>) };
    let error = unsafe { &*error };

    if error.level < XML_ERR_ERROR || error.message.is_null() {
        return;
    }

    let message = unsafe { CStr::from_ptr(error.message) }
        .to_string_lossy()
        .trim()
        .to_string();
    let line = usize::try_from(error.line).ok().filter(|&line| line > 0);

    errors.push(StructuredError { line, message });
}

/// Shared, reference-counted compiled schema
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: compiled xmlSchema structures are read-only during validation
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlSchemaParse` and must not be freed elsewhere.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed { errors: Vec::new() });
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut XmlSchema {
        self.inner.ptr
    }

    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Owned parsed document; confined to the thread that parsed it
#[derive(Debug)]
pub struct XmlDocPtr {
    ptr: *mut XmlDoc,
}

impl XmlDocPtr {
    fn as_ptr(&self) -> *mut XmlDoc {
        self.ptr
    }
}

impl Drop for XmlDocPtr {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Outcome of parsing a document from memory
#[derive(Debug)]
pub struct ParsedDocument {
    /// `None` when libxml2 gave up on the input
    pub document: Option<XmlDocPtr>,
    /// Well-formedness and namespace errors
    pub errors: Vec<StructuredError>,
}

impl ParsedDocument {
    pub fn is_well_formed(&self) -> bool {
        self.document.is_some() && self.errors.is_empty()
    }
}

/// Validation result from libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (return code > 0)
    Invalid {
        error_count: i32,
        errors: Vec<StructuredError>,
    },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl ValidationResult {
    pub fn from_code(code: c_int, errors: Vec<StructuredError>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid {
                error_count: n,
                errors,
            },
            n => ValidationResult::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::InternalError { .. })
    }
}

fn buffer_len(len: usize) -> LibXml2Result<c_int> {
    c_int::try_from(len).map_err(|_| LibXml2Error::InvalidInput {
        details: format!("{} bytes exceeds the libxml2 buffer limit", len),
    })
}

/// Safe entry point to libxml2
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Initializes libxml2 on first use
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Compile an XML schema from memory.
    ///
    /// # Errors
    ///
    /// `SchemaParseFailed` with every error libxml2 reported (positions refer
    /// to the schema text), or `MemoryAllocation` when no parser context could
    /// be created.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        // libxml2 refuses to create a parser context for an empty buffer
        if schema_data.is_empty() {
            return Err(LibXml2Error::SchemaParseFailed { errors: Vec::new() });
        }
        let size = buffer_len(schema_data.len())?;
        let _guard = SCHEMA_PARSE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut errors: Vec<StructuredError> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<StructuredError> as *mut c_void;

        let schema_ptr = unsafe {
            let parser_ctxt =
                xmlSchemaNewMemParserCtxt(schema_data.as_ptr() as *const c_char, size);
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );
            xmlSetStructuredErrorFunc(errors_ptr, Some(structured_error_callback));

            let schema_ptr = xmlSchemaParse(parser_ctxt);

            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
            xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        };

        if schema_ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed { errors });
        }

        unsafe { XmlSchemaPtr::from_raw(schema_ptr) }
    }

    /// Parse a document from memory, collecting well-formedness errors.
    ///
    /// With `strip_blanks` ignorable whitespace is dropped so that
    /// [`format_document`](Self::format_document) can re-indent the tree.
    pub fn read_document_from_memory(
        &self,
        text: &str,
        strip_blanks: bool,
    ) -> LibXml2Result<ParsedDocument> {
        let size = buffer_len(text.len())?;
        let mut options = XML_PARSE_NONET;
        if strip_blanks {
            options |= XML_PARSE_NOBLANKS;
        }

        let mut errors: Vec<StructuredError> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<StructuredError> as *mut c_void;

        let doc = unsafe {
            xmlSetStructuredErrorFunc(errors_ptr, Some(structured_error_callback));
            let doc = xmlReadMemory(
                text.as_ptr() as *const c_char,
                size,
                c"instance.xml".as_ptr(),
                c"UTF-8".as_ptr(),
                options,
            );
            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
            doc
        };

        let document = if doc.is_null() {
            // An empty buffer is rejected before the parser reports anything
            if errors.is_empty() {
                errors.push(StructuredError {
                    line: Some(1),
                    message: "Document is empty".to_string(),
                });
            }
            None
        } else {
            Some(XmlDocPtr { ptr: doc })
        };

        Ok(ParsedDocument { document, errors })
    }

    /// Validate a parsed document against a compiled schema
    ///
    /// # Errors
    ///
    /// `ValidationContextCreationFailed` when libxml2 cannot create a context,
    /// `InternalError` when validation itself breaks down (negative code).
    pub fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        document: &XmlDocPtr,
    ) -> LibXml2Result<ValidationResult> {
        let mut errors: Vec<StructuredError> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<StructuredError> as *mut c_void;

        let result_code = unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );

            let code = xmlSchemaValidateDoc(valid_ctxt, document.as_ptr());
            xmlSchemaFreeValidCtxt(valid_ctxt);
            code
        };

        match ValidationResult::from_code(result_code, errors) {
            ValidationResult::InternalError { code } => Err(LibXml2Error::InternalError {
                details: format!("xmlSchemaValidateDoc returned {}", code),
            }),
            result => Ok(result),
        }
    }

    /// Serialize a document indented, as `xmllint --format` does
    pub fn format_document(&self, document: &XmlDocPtr) -> LibXml2Result<String> {
        let mut buffer: *mut u8 = std::ptr::null_mut();
        let mut size: c_int = 0;

        let bytes = unsafe {
            xmlDocDumpFormatMemoryEnc(
                document.as_ptr(),
                &mut buffer,
                &mut size,
                c"UTF-8".as_ptr(),
                1,
            );

            if buffer.is_null() {
                return Err(LibXml2Error::SerializationFailed {
                    details: "no output produced".to_string(),
                });
            }

            let len = usize::try_from(size).unwrap_or(0);
            let bytes = std::slice::from_raw_parts(buffer, len).to_vec();
            // libxml2's default allocator is malloc
            libc::free(buffer as *mut c_void);
            bytes
        };

        String::from_utf8(bytes).map_err(|e| LibXml2Error::SerializationFailed {
            details: e.to_string(),
        })
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
