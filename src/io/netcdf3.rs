//! NetCDF-3 classic binary files
//!
//! A self-contained reader and writer for the CDF-1 and CDF-2 formats:
//! big-endian header with dimension, attribute and variable lists,
//! followed by the non-record data then the interleaved record slabs.
//! No external NetCDF library is involved.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{Error, Result};
use crate::io::trajectory::Mode;

// list tags in the file header
const NC_DIMENSION: i32 = 0x0A;
const NC_VARIABLE: i32 = 0x0B;
const NC_ATTRIBUTE: i32 = 0x0C;
const NC_ABSENT: i32 = 0;

// numrecs value used by writers that stream records without patching
// the header
const NC_STREAMING: i32 = i32::MAX;

/// The type of a NetCDF-3 variable or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 8-bit signed integer
    Byte,
    /// 8-bit character
    Char,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
}

impl DataType {
    fn from_i32(value: i32) -> Result<DataType> {
        match value {
            1 => Ok(DataType::Byte),
            2 => Ok(DataType::Char),
            3 => Ok(DataType::Short),
            4 => Ok(DataType::Int),
            5 => Ok(DataType::Float),
            6 => Ok(DataType::Double),
            other => Err(Error::format(format!(
                "invalid NetCDF type identifier: {}",
                other
            ))),
        }
    }

    fn as_i32(&self) -> i32 {
        match self {
            DataType::Byte => 1,
            DataType::Char => 2,
            DataType::Short => 3,
            DataType::Int => 4,
            DataType::Float => 5,
            DataType::Double => 6,
        }
    }

    /// Size of one value of this type in bytes
    pub fn size(&self) -> usize {
        match self {
            DataType::Byte | DataType::Char => 1,
            DataType::Short => 2,
            DataType::Int => 4,
            DataType::Float => 4,
            DataType::Double => 8,
        }
    }
}

/// An attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 8-bit integers
    Byte(Vec<i8>),
    /// 16-bit integers
    Short(Vec<i16>),
    /// 32-bit integers
    Int(Vec<i32>),
    /// 32-bit floats
    Float(Vec<f32>),
    /// 64-bit floats
    Double(Vec<f64>),
    /// Character data
    String(String),
}

impl Value {
    /// The NetCDF type of this value
    pub fn nc_type(&self) -> DataType {
        match self {
            Value::Byte(_) => DataType::Byte,
            Value::Short(_) => DataType::Short,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::Char,
        }
    }

    fn nelems(&self) -> usize {
        match self {
            Value::Byte(values) => values.len(),
            Value::Short(values) => values.len(),
            Value::Int(values) => values.len(),
            Value::Float(values) => values.len(),
            Value::Double(values) => values.len(),
            Value::String(value) => value.len(),
        }
    }

    /// Get this value as a string, failing on numeric values
    pub fn as_string(&self) -> Result<&str> {
        match self {
            Value::String(value) => Ok(value),
            _ => Err(Error::format("expected a string attribute value")),
        }
    }

    /// Get this value as a single float, converting from any numeric
    /// type
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Byte(values) if values.len() == 1 => Ok(values[0] as f64),
            Value::Short(values) if values.len() == 1 => Ok(values[0] as f64),
            Value::Int(values) if values.len() == 1 => Ok(values[0] as f64),
            Value::Float(values) if values.len() == 1 => Ok(values[0] as f64),
            Value::Double(values) if values.len() == 1 => Ok(values[0]),
            _ => Err(Error::format("expected a single numeric attribute value")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::Float(vec![value])
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Double(vec![value])
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(vec![value])
    }
}

/// A dimension of a NetCDF-3 file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    /// The dimension name
    pub name: String,
    /// The dimension size; 0 marks the record dimension
    pub size: usize,
}

impl Dimension {
    /// Whether this is the record (unlimited) dimension
    pub fn is_record(&self) -> bool {
        self.size == 0
    }
}

/// A variable descriptor: everything needed to locate and type its data
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    nc_type: DataType,
    dimensions: Vec<usize>,
    attributes: BTreeMap<String, Value>,
    // per-record byte size, including padding, as stored in the header
    vsize: usize,
    begin: u64,
    is_record: bool,
    // number of values per record (or in total for non-record data)
    count: usize,
}

impl Variable {
    /// The variable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type of the data in this variable
    pub fn nc_type(&self) -> DataType {
        self.nc_type
    }

    /// The ids of the dimensions of this variable
    pub fn dimension_ids(&self) -> &[usize] {
        &self.dimensions
    }

    /// Whether the first dimension is the record dimension
    pub fn is_record(&self) -> bool {
        self.is_record
    }

    /// Number of values in one record of this variable
    pub fn count(&self) -> usize {
        self.count
    }

    /// Get an attribute of this variable by name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Definition of a variable for the [`Netcdf3Builder`]
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    /// The type of the data
    pub nc_type: DataType,
    /// Dimension ids, record dimension first if any
    pub dimensions: Vec<usize>,
    /// Variable attributes
    pub attributes: Vec<(String, Value)>,
}

/// A NetCDF-3 classic file, opened for reading or writing
#[derive(Debug)]
pub struct Netcdf3File {
    file: File,
    path: PathBuf,
    use_64bit_offsets: bool,
    dimensions: Vec<Dimension>,
    attributes: BTreeMap<String, Value>,
    variables: BTreeMap<String, Variable>,
    numrecs: usize,
    record_stride: u64,
    initialized: bool,
}

impl Netcdf3File {
    /// Open the file at `path` in the given mode. In write mode the
    /// file starts uninitialized, waiting for a [`Netcdf3Builder`].
    pub fn open(path: &Path, mode: Mode) -> Result<Netcdf3File> {
        let file = match mode {
            Mode::Read => File::open(path)?,
            Mode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
            Mode::Append => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?,
        };

        let mut netcdf = Netcdf3File {
            file,
            path: path.to_path_buf(),
            use_64bit_offsets: false,
            dimensions: Vec::new(),
            attributes: BTreeMap::new(),
            variables: BTreeMap::new(),
            numrecs: 0,
            record_stride: 0,
            initialized: false,
        };

        let has_content = netcdf.file.seek(SeekFrom::End(0))? != 0;
        match mode {
            Mode::Read => {
                netcdf.parse_header()?;
                netcdf.initialized = true;
            }
            Mode::Append if has_content => {
                netcdf.parse_header()?;
                netcdf.initialized = true;
            }
            _ => {}
        }
        Ok(netcdf)
    }

    /// The path of this file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file header was parsed or written already
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// All dimensions in the file
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Get a dimension by name
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// All global attributes
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Get a global attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// All variables in the file
    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    /// Get a variable descriptor by name
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// The dimensions of a variable, in order
    pub fn variable_dimensions(&self, variable: &Variable) -> Vec<&Dimension> {
        variable
            .dimensions
            .iter()
            .map(|&id| &self.dimensions[id])
            .collect()
    }

    /// Number of records written to the file
    pub fn n_records(&self) -> usize {
        self.numrecs
    }

    /// Declare one more record, patching the header count
    pub fn add_record(&mut self) -> Result<()> {
        self.numrecs += 1;
        self.file.seek(SeekFrom::Start(4))?;
        self.file.write_i32::<BigEndian>(self.numrecs as i32)?;
        Ok(())
    }

    /// Read one record of a float variable
    pub fn read_f32(&mut self, variable: &Variable, record: usize, data: &mut Vec<f32>) -> Result<()> {
        self.check_type(variable, DataType::Float)?;
        self.seek_to(variable, record)?;
        data.resize(variable.count, 0.0);
        self.file.read_f32_into::<BigEndian>(data)?;
        Ok(())
    }

    /// Read one record of a double variable
    pub fn read_f64(&mut self, variable: &Variable, record: usize, data: &mut Vec<f64>) -> Result<()> {
        self.check_type(variable, DataType::Double)?;
        self.seek_to(variable, record)?;
        data.resize(variable.count, 0.0);
        self.file.read_f64_into::<BigEndian>(data)?;
        Ok(())
    }

    /// Write one record of a float variable
    pub fn write_f32(&mut self, variable: &Variable, record: usize, data: &[f32]) -> Result<()> {
        self.check_type(variable, DataType::Float)?;
        self.check_count(variable, data.len())?;
        self.seek_to(variable, record)?;
        for &value in data {
            self.file.write_f32::<BigEndian>(value)?;
        }
        Ok(())
    }

    /// Write one record of a double variable
    pub fn write_f64(&mut self, variable: &Variable, record: usize, data: &[f64]) -> Result<()> {
        self.check_type(variable, DataType::Double)?;
        self.check_count(variable, data.len())?;
        self.seek_to(variable, record)?;
        for &value in data {
            self.file.write_f64::<BigEndian>(value)?;
        }
        Ok(())
    }

    /// Write character data into a char variable, zero-padded to the
    /// variable size
    pub fn write_chars(&mut self, variable: &Variable, record: usize, data: &str) -> Result<()> {
        self.check_type(variable, DataType::Char)?;
        if data.len() > variable.count {
            return Err(Error::format(format!(
                "character data is too long for variable '{}': {} bytes for {}",
                variable.name,
                data.len(),
                variable.count
            )));
        }
        self.seek_to(variable, record)?;
        self.file.write_all(data.as_bytes())?;
        let padding = vec![0u8; variable.count - data.len()];
        self.file.write_all(&padding)?;
        Ok(())
    }

    fn check_type(&self, variable: &Variable, expected: DataType) -> Result<()> {
        if variable.nc_type != expected {
            return Err(Error::format(format!(
                "variable '{}' does not hold {:?} data",
                variable.name, expected
            )));
        }
        Ok(())
    }

    fn check_count(&self, variable: &Variable, len: usize) -> Result<()> {
        if len != variable.count {
            return Err(Error::format(format!(
                "wrong number of values for variable '{}': expected {}, got {}",
                variable.name, variable.count, len
            )));
        }
        Ok(())
    }

    fn seek_to(&mut self, variable: &Variable, record: usize) -> Result<()> {
        let offset = if variable.is_record {
            variable.begin + record as u64 * self.record_stride
        } else {
            variable.begin
        };
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /*** header parsing ***/

    fn parse_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 4];
        self.file.read_exact(&mut magic)?;
        if &magic[..3] != b"CDF" {
            return Err(Error::format(format!(
                "the file at '{}' is not a NetCDF-3 file",
                self.path.display()
            )));
        }
        self.use_64bit_offsets = match magic[3] {
            1 => false,
            2 => true,
            other => {
                return Err(Error::format(format!(
                    "unsupported NetCDF version {} in file at '{}'",
                    other,
                    self.path.display()
                )));
            }
        };

        let numrecs = self.file.read_i32::<BigEndian>()?;
        let streaming = numrecs == NC_STREAMING;
        if !streaming && numrecs < 0 {
            return Err(Error::format("invalid record count in NetCDF-3 file"));
        }

        self.dimensions = self.parse_dimension_list()?;
        let record_dims = self.dimensions.iter().filter(|d| d.is_record()).count();
        if record_dims > 1 {
            return Err(Error::format(
                "a NetCDF-3 file can only contain one record dimension",
            ));
        }

        self.attributes = self.parse_attribute_list()?;
        self.parse_variable_list()?;

        // the stride between two records covers every record variable,
        // except that the single record variable of a file keeps its
        // natural, unpadded size when it is byte, char or short data
        let record_variables: Vec<&Variable> =
            self.variables.values().filter(|v| v.is_record).collect();
        self.record_stride = if record_variables.len() == 1
            && record_variables[0].nc_type.size() < 4
        {
            (record_variables[0].count * record_variables[0].nc_type.size()) as u64
        } else {
            record_variables.iter().map(|v| v.vsize as u64).sum()
        };

        if streaming {
            let record_begin = record_variables.iter().map(|v| v.begin).min();
            let length = self.file.seek(SeekFrom::End(0))?;
            self.numrecs = match (record_begin, self.record_stride) {
                (Some(begin), stride) if stride > 0 => ((length - begin) / stride) as usize,
                _ => 0,
            };
        } else {
            self.numrecs = numrecs as usize;
        }

        Ok(())
    }

    fn parse_name(&mut self) -> Result<String> {
        let length = self.file.read_i32::<BigEndian>()?;
        if length < 0 {
            return Err(Error::format("invalid name length in NetCDF-3 header"));
        }
        let padded = padded4(length as usize);
        let mut buffer = vec![0u8; padded];
        self.file.read_exact(&mut buffer)?;
        buffer.truncate(length as usize);
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn parse_dimension_list(&mut self) -> Result<Vec<Dimension>> {
        let tag = self.file.read_i32::<BigEndian>()?;
        let nelems = self.file.read_i32::<BigEndian>()?;
        if tag == NC_ABSENT && nelems == 0 {
            return Ok(Vec::new());
        }
        if tag != NC_DIMENSION || nelems < 0 {
            return Err(Error::format("invalid dimension list in NetCDF-3 header"));
        }

        let mut dimensions = Vec::with_capacity(nelems as usize);
        for _ in 0..nelems {
            let name = self.parse_name()?;
            let size = self.file.read_i32::<BigEndian>()?;
            if size < 0 {
                return Err(Error::format("invalid dimension size in NetCDF-3 header"));
            }
            dimensions.push(Dimension {
                name,
                size: size as usize,
            });
        }
        Ok(dimensions)
    }

    fn parse_attribute_list(&mut self) -> Result<BTreeMap<String, Value>> {
        let tag = self.file.read_i32::<BigEndian>()?;
        let nelems = self.file.read_i32::<BigEndian>()?;
        if tag == NC_ABSENT && nelems == 0 {
            return Ok(BTreeMap::new());
        }
        if tag != NC_ATTRIBUTE || nelems < 0 {
            return Err(Error::format("invalid attribute list in NetCDF-3 header"));
        }

        let mut attributes = BTreeMap::new();
        for _ in 0..nelems {
            let name = self.parse_name()?;
            let value = self.parse_attribute_value()?;
            attributes.insert(name, value);
        }
        Ok(attributes)
    }

    fn parse_attribute_value(&mut self) -> Result<Value> {
        let nc_type = DataType::from_i32(self.file.read_i32::<BigEndian>()?)?;
        let nelems = self.file.read_i32::<BigEndian>()?;
        if nelems < 0 {
            return Err(Error::format("invalid attribute size in NetCDF-3 header"));
        }
        let nelems = nelems as usize;
        let padding = padded4(nelems * nc_type.size()) - nelems * nc_type.size();

        let value = match nc_type {
            DataType::Char => {
                let mut buffer = vec![0u8; nelems];
                self.file.read_exact(&mut buffer)?;
                Value::String(String::from_utf8_lossy(&buffer).into_owned())
            }
            DataType::Byte => {
                let mut values = vec![0i8; nelems];
                self.file.read_i8_into(&mut values)?;
                Value::Byte(values)
            }
            DataType::Short => {
                let mut values = vec![0i16; nelems];
                self.file.read_i16_into::<BigEndian>(&mut values)?;
                Value::Short(values)
            }
            DataType::Int => {
                let mut values = vec![0i32; nelems];
                self.file.read_i32_into::<BigEndian>(&mut values)?;
                Value::Int(values)
            }
            DataType::Float => {
                let mut values = vec![0.0f32; nelems];
                self.file.read_f32_into::<BigEndian>(&mut values)?;
                Value::Float(values)
            }
            DataType::Double => {
                let mut values = vec![0.0f64; nelems];
                self.file.read_f64_into::<BigEndian>(&mut values)?;
                Value::Double(values)
            }
        };

        let mut pad = vec![0u8; padding];
        self.file.read_exact(&mut pad)?;
        Ok(value)
    }

    fn parse_variable_list(&mut self) -> Result<()> {
        let tag = self.file.read_i32::<BigEndian>()?;
        let nelems = self.file.read_i32::<BigEndian>()?;
        if tag == NC_ABSENT && nelems == 0 {
            return Ok(());
        }
        if tag != NC_VARIABLE || nelems < 0 {
            return Err(Error::format("invalid variable list in NetCDF-3 header"));
        }

        for _ in 0..nelems {
            let name = self.parse_name()?;
            let ndims = self.file.read_i32::<BigEndian>()?;
            if ndims < 0 {
                return Err(Error::format("invalid dimension count in NetCDF-3 header"));
            }
            let mut dimensions = Vec::with_capacity(ndims as usize);
            for _ in 0..ndims {
                let id = self.file.read_i32::<BigEndian>()?;
                if id < 0 || id as usize >= self.dimensions.len() {
                    return Err(Error::format(format!(
                        "invalid dimension id {} in NetCDF-3 header",
                        id
                    )));
                }
                dimensions.push(id as usize);
            }
            let attributes = self.parse_attribute_list()?;
            let nc_type = DataType::from_i32(self.file.read_i32::<BigEndian>()?)?;
            let vsize = self.file.read_i32::<BigEndian>()?;
            if vsize < 0 {
                return Err(Error::format("invalid variable size in NetCDF-3 header"));
            }
            let begin = if self.use_64bit_offsets {
                self.file.read_i64::<BigEndian>()? as u64
            } else {
                self.file.read_i32::<BigEndian>()? as u64
            };

            let is_record = dimensions
                .first()
                .map(|&id| self.dimensions[id].is_record())
                .unwrap_or(false);
            for &id in dimensions.iter().skip(1) {
                if self.dimensions[id].is_record() {
                    return Err(Error::format(
                        "the record dimension must be the first dimension of a variable",
                    ));
                }
            }
            let count = dimensions
                .iter()
                .skip(if is_record { 1 } else { 0 })
                .map(|&id| self.dimensions[id].size)
                .product::<usize>();

            self.variables.insert(
                name.clone(),
                Variable {
                    name,
                    nc_type,
                    dimensions,
                    attributes,
                    vsize: vsize as usize,
                    begin,
                    is_record,
                    count,
                },
            );
        }
        Ok(())
    }

    /*** header writing, driven by the builder ***/

    fn write_name(&mut self, name: &str) -> Result<()> {
        self.file.write_i32::<BigEndian>(name.len() as i32)?;
        self.file.write_all(name.as_bytes())?;
        let padding = padded4(name.len()) - name.len();
        self.file.write_all(&[0u8; 3][..padding])?;
        Ok(())
    }

    fn write_attribute_value(&mut self, value: &Value) -> Result<()> {
        self.file.write_i32::<BigEndian>(value.nc_type().as_i32())?;
        self.file.write_i32::<BigEndian>(value.nelems() as i32)?;
        let data_size = value.nelems() * value.nc_type().size();
        match value {
            Value::String(data) => self.file.write_all(data.as_bytes())?,
            Value::Byte(values) => {
                for &v in values {
                    self.file.write_i8(v)?;
                }
            }
            Value::Short(values) => {
                for &v in values {
                    self.file.write_i16::<BigEndian>(v)?;
                }
            }
            Value::Int(values) => {
                for &v in values {
                    self.file.write_i32::<BigEndian>(v)?;
                }
            }
            Value::Float(values) => {
                for &v in values {
                    self.file.write_f32::<BigEndian>(v)?;
                }
            }
            Value::Double(values) => {
                for &v in values {
                    self.file.write_f64::<BigEndian>(v)?;
                }
            }
        }
        let padding = padded4(data_size) - data_size;
        self.file.write_all(&[0u8; 3][..padding])?;
        Ok(())
    }

    fn write_attribute_list(&mut self, attributes: &[(String, Value)]) -> Result<()> {
        if attributes.is_empty() {
            self.file.write_i32::<BigEndian>(NC_ABSENT)?;
            self.file.write_i32::<BigEndian>(0)?;
            return Ok(());
        }
        self.file.write_i32::<BigEndian>(NC_ATTRIBUTE)?;
        self.file.write_i32::<BigEndian>(attributes.len() as i32)?;
        for (name, value) in attributes {
            self.write_name(name)?;
            self.write_attribute_value(value)?;
        }
        Ok(())
    }
}

/// Accumulates dimensions, attributes and variables, then computes the
/// data layout and writes the file header
#[derive(Debug, Clone, Default)]
pub struct Netcdf3Builder {
    dimensions: Vec<Dimension>,
    attributes: Vec<(String, Value)>,
    variables: Vec<(String, VariableDefinition)>,
}

impl Netcdf3Builder {
    /// Create an empty builder
    pub fn new() -> Netcdf3Builder {
        Netcdf3Builder::default()
    }

    /// Add a dimension, returning its id. A size of 0 declares the
    /// record dimension.
    pub fn add_dimension(&mut self, name: impl Into<String>, size: usize) -> usize {
        self.dimensions.push(Dimension {
            name: name.into(),
            size,
        });
        self.dimensions.len() - 1
    }

    /// The dimensions declared so far
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Get the id of a dimension by name
    pub fn dimension_id(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Add a global attribute
    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.push((name.into(), value.into()));
    }

    /// Add a variable
    pub fn add_variable(&mut self, name: impl Into<String>, definition: VariableDefinition) -> Result<()> {
        let name = name.into();
        for (position, &id) in definition.dimensions.iter().enumerate() {
            let dimension = self.dimensions.get(id).ok_or_else(|| {
                Error::invalid(format!(
                    "invalid dimension id {} for variable '{}'",
                    id, name
                ))
            })?;
            if dimension.is_record() && position != 0 {
                return Err(Error::invalid(format!(
                    "the record dimension must be the first dimension of variable '{}'",
                    name
                )));
            }
        }
        self.variables.push((name, definition));
        Ok(())
    }

    /// Compute the data layout, write the header and switch `file` to
    /// data mode. No structural change is possible afterwards.
    pub fn initialize(self, netcdf: &mut Netcdf3File) -> Result<()> {
        if netcdf.initialized {
            return Err(Error::invalid(
                "this NetCDF-3 file was already initialized",
            ));
        }
        if self.dimensions.iter().filter(|d| d.is_record()).count() > 1 {
            return Err(Error::invalid(
                "a NetCDF-3 file can only contain one record dimension",
            ));
        }

        // compute per-variable sizes
        let mut variables = BTreeMap::new();
        let mut order = Vec::new();
        for (name, definition) in &self.variables {
            let is_record = definition
                .dimensions
                .first()
                .map(|&id| self.dimensions[id].is_record())
                .unwrap_or(false);
            let count = definition
                .dimensions
                .iter()
                .skip(if is_record { 1 } else { 0 })
                .map(|&id| self.dimensions[id].size)
                .product::<usize>();
            let vsize = padded4(count * definition.nc_type.size());
            order.push(name.clone());
            variables.insert(
                name.clone(),
                Variable {
                    name: name.clone(),
                    nc_type: definition.nc_type,
                    dimensions: definition.dimensions.clone(),
                    attributes: definition
                        .attributes
                        .iter()
                        .cloned()
                        .collect::<BTreeMap<_, _>>(),
                    vsize,
                    begin: 0,
                    is_record,
                    count,
                },
            );
        }

        // assign offsets: non-record data first, then one record slab.
        // When 32-bit offsets do not fit, switch to the CDF-2 format
        // (whose larger header changes every offset) and lay out again.
        let mut use_64bit_offsets = false;
        loop {
            let header_size = self.header_size(use_64bit_offsets);
            let mut offset = header_size as u64;
            for name in &order {
                if let Some(variable) = variables.get_mut(name) {
                    if !variable.is_record {
                        variable.begin = offset;
                        offset += variable.vsize as u64;
                    }
                }
            }
            for name in &order {
                if let Some(variable) = variables.get_mut(name) {
                    if variable.is_record {
                        variable.begin = offset;
                        offset += variable.vsize as u64;
                    }
                }
            }

            let fits = variables.values().all(|v| v.begin <= i32::MAX as u64);
            if fits || use_64bit_offsets {
                break;
            }
            use_64bit_offsets = true;
        }

        let record_variables: Vec<&Variable> = variables.values().filter(|v| v.is_record).collect();
        let record_stride = if record_variables.len() == 1 && record_variables[0].nc_type.size() < 4
        {
            (record_variables[0].count * record_variables[0].nc_type.size()) as u64
        } else {
            record_variables.iter().map(|v| v.vsize as u64).sum()
        };
        let data_start: u64 = variables
            .values()
            .filter(|v| !v.is_record)
            .map(|v| v.begin + v.vsize as u64)
            .max()
            .unwrap_or(self.header_size(use_64bit_offsets) as u64);

        // write the header
        netcdf.use_64bit_offsets = use_64bit_offsets;
        netcdf.file.seek(SeekFrom::Start(0))?;
        netcdf
            .file
            .write_all(if use_64bit_offsets { b"CDF\x02" } else { b"CDF\x01" })?;
        netcdf.file.write_i32::<BigEndian>(0)?; // numrecs

        if self.dimensions.is_empty() {
            netcdf.file.write_i32::<BigEndian>(NC_ABSENT)?;
            netcdf.file.write_i32::<BigEndian>(0)?;
        } else {
            netcdf.file.write_i32::<BigEndian>(NC_DIMENSION)?;
            netcdf
                .file
                .write_i32::<BigEndian>(self.dimensions.len() as i32)?;
            for dimension in &self.dimensions {
                netcdf.write_name(&dimension.name)?;
                netcdf.file.write_i32::<BigEndian>(dimension.size as i32)?;
            }
        }

        netcdf.write_attribute_list(&self.attributes)?;

        if order.is_empty() {
            netcdf.file.write_i32::<BigEndian>(NC_ABSENT)?;
            netcdf.file.write_i32::<BigEndian>(0)?;
        } else {
            netcdf.file.write_i32::<BigEndian>(NC_VARIABLE)?;
            netcdf.file.write_i32::<BigEndian>(order.len() as i32)?;
            for name in &order {
                let variable = &variables[name];
                netcdf.write_name(name)?;
                netcdf
                    .file
                    .write_i32::<BigEndian>(variable.dimensions.len() as i32)?;
                for &id in &variable.dimensions {
                    netcdf.file.write_i32::<BigEndian>(id as i32)?;
                }
                let attributes: Vec<(String, Value)> = variable
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                netcdf.write_attribute_list(&attributes)?;
                netcdf
                    .file
                    .write_i32::<BigEndian>(variable.nc_type.as_i32())?;
                netcdf.file.write_i32::<BigEndian>(variable.vsize as i32)?;
                if use_64bit_offsets {
                    netcdf.file.write_i64::<BigEndian>(variable.begin as i64)?;
                } else {
                    netcdf.file.write_i32::<BigEndian>(variable.begin as i32)?;
                }
            }
        }

        // zero-fill the non-record data so unwritten variables read as
        // zeros, leaving the cursor at the start of the record data
        let header_end = netcdf.file.stream_position()?;
        let zeros = vec![0u8; (data_start - header_end) as usize];
        netcdf.file.write_all(&zeros)?;

        netcdf.dimensions = self.dimensions;
        netcdf.attributes = self.attributes.into_iter().collect();
        netcdf.variables = variables;
        netcdf.numrecs = 0;
        netcdf.record_stride = record_stride;
        netcdf.initialized = true;
        Ok(())
    }

    fn header_size(&self, use_64bit_offsets: bool) -> usize {
        fn name_size(name: &str) -> usize {
            4 + padded4(name.len())
        }
        fn attributes_size(attributes: &[(String, Value)]) -> usize {
            let mut size = 8;
            for (name, value) in attributes {
                size += name_size(name) + 8 + padded4(value.nelems() * value.nc_type().size());
            }
            size
        }

        // magic + numrecs
        let mut size = 8;
        // dimension list
        size += 8;
        for dimension in &self.dimensions {
            size += name_size(&dimension.name) + 4;
        }
        size += attributes_size(&self.attributes);
        // variable list
        size += 8;
        for (name, definition) in &self.variables {
            size += name_size(name);
            size += 4 + 4 * definition.dimensions.len();
            size += attributes_size(&definition.attributes);
            size += 4 + 4; // nc_type + vsize
            size += if use_64bit_offsets { 8 } else { 4 };
        }
        size
    }
}

fn padded4(size: usize) -> usize {
    (size + 3) & !3
}
