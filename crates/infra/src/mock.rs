//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使うインメモリ実装。
//! `test-utils` feature を有効にすると他クレートからも利用できる。
//!
//! ```toml
//! [dev-dependencies]
//! validflow-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use validflow_domain::{
   delegation::{Delegation, DelegationId},
   employee::{Employee, UserId},
   request::{Request, RequestId, RequestType},
   value_objects::Version,
   workflow::{ValidationWorkflow, ValidationWorkflowId},
};

use crate::{
   db::{TransactionManager, TxContext},
   error::InfraError,
   repository::{DelegationRepository, OrgDirectory, RequestRepository, ValidationWorkflowRepository},
};

// ===== MockTransactionManager =====

pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
   async fn begin(&self) -> Result<TxContext, InfraError> {
      Ok(TxContext::mock())
   }
}

// ===== MockValidationWorkflowRepository =====

#[derive(Clone, Default)]
pub struct MockValidationWorkflowRepository {
   workflows: Arc<Mutex<Vec<ValidationWorkflow>>>,
}

impl MockValidationWorkflowRepository {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn add_workflow(&self, workflow: ValidationWorkflow) {
      self.workflows.lock().unwrap().push(workflow);
   }
}

#[async_trait]
impl ValidationWorkflowRepository for MockValidationWorkflowRepository {
   async fn insert(
      &self,
      _tx: &mut TxContext,
      workflow: &ValidationWorkflow,
   ) -> Result<(), InfraError> {
      self.workflows.lock().unwrap().push(workflow.clone());
      Ok(())
   }

   async fn update_with_version_check(
      &self,
      _tx: &mut TxContext,
      workflow: &ValidationWorkflow,
      expected_version: Version,
   ) -> Result<(), InfraError> {
      let mut workflows = self.workflows.lock().unwrap();
      match workflows
         .iter()
         .position(|w| w.id() == workflow.id() && w.version() == expected_version)
      {
         Some(pos) => {
            workflows[pos] = workflow.clone();
            Ok(())
         }
         None => Err(InfraError::conflict(
            "ValidationWorkflow",
            workflow.id().to_string(),
         )),
      }
   }

   async fn delete(&self, _tx: &mut TxContext, id: &ValidationWorkflowId) -> Result<(), InfraError> {
      self.workflows.lock().unwrap().retain(|w| w.id() != id);
      Ok(())
   }

   async fn find_by_id(
      &self,
      id: &ValidationWorkflowId,
   ) -> Result<Option<ValidationWorkflow>, InfraError> {
      Ok(self
         .workflows
         .lock()
         .unwrap()
         .iter()
         .find(|w| w.id() == id)
         .cloned())
   }

   async fn find_all(&self) -> Result<Vec<ValidationWorkflow>, InfraError> {
      Ok(self.workflows.lock().unwrap().clone())
   }

   async fn find_active_by_trigger(
      &self,
      request_type: RequestType,
   ) -> Result<Vec<ValidationWorkflow>, InfraError> {
      Ok(self
         .workflows
         .lock()
         .unwrap()
         .iter()
         .filter(|w| w.is_active() && w.trigger() == request_type)
         .cloned()
         .collect())
   }
}

// ===== MockRequestRepository =====

#[derive(Clone, Default)]
pub struct MockRequestRepository {
   requests: Arc<Mutex<Vec<Request>>>,
}

impl MockRequestRepository {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn add_request(&self, request: Request) {
      self.requests.lock().unwrap().push(request);
   }
}

#[async_trait]
impl RequestRepository for MockRequestRepository {
   async fn insert(&self, _tx: &mut TxContext, request: &Request) -> Result<(), InfraError> {
      self.requests.lock().unwrap().push(request.clone());
      Ok(())
   }

   async fn update_with_version_check(
      &self,
      _tx: &mut TxContext,
      request: &Request,
      expected_version: Version,
   ) -> Result<(), InfraError> {
      let mut requests = self.requests.lock().unwrap();
      match requests
         .iter()
         .position(|r| r.id() == request.id() && r.version() == expected_version)
      {
         Some(pos) => {
            requests[pos] = request.clone();
            Ok(())
         }
         None => Err(InfraError::conflict("Request", request.id().to_string())),
      }
   }

   async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, InfraError> {
      Ok(self
         .requests
         .lock()
         .unwrap()
         .iter()
         .find(|r| r.id() == id)
         .cloned())
   }

   async fn find_by_requester(&self, requester_id: &UserId) -> Result<Vec<Request>, InfraError> {
      let mut found: Vec<Request> = self
         .requests
         .lock()
         .unwrap()
         .iter()
         .filter(|r| r.requester_id() == requester_id)
         .cloned()
         .collect();
      found.sort_by_key(|r| std::cmp::Reverse(r.submitted_at()));
      Ok(found)
   }

   async fn find_open(
      &self,
      request_type: Option<RequestType>,
   ) -> Result<Vec<Request>, InfraError> {
      let mut found: Vec<Request> = self
         .requests
         .lock()
         .unwrap()
         .iter()
         .filter(|r| !r.status().is_terminal())
         .filter(|r| request_type.is_none_or(|t| r.request_type() == t))
         .cloned()
         .collect();
      found.sort_by_key(|r| r.submitted_at());
      Ok(found)
   }

   async fn count_open_by_workflow(
      &self,
      workflow_id: &ValidationWorkflowId,
   ) -> Result<u64, InfraError> {
      let count = self
         .requests
         .lock()
         .unwrap()
         .iter()
         .filter(|r| r.workflow_id() == workflow_id && !r.status().is_terminal())
         .count();
      Ok(count as u64)
   }
}

// ===== MockDelegationRepository =====

#[derive(Clone, Default)]
pub struct MockDelegationRepository {
   delegations: Arc<Mutex<Vec<Delegation>>>,
   /// 委任元ロックの代わり（全委任元で共有）
   delegator_lock: Arc<tokio::sync::Mutex<()>>,
}

impl MockDelegationRepository {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn add_delegation(&self, delegation: Delegation) {
      self.delegations.lock().unwrap().push(delegation);
   }
}

#[async_trait]
impl DelegationRepository for MockDelegationRepository {
   async fn insert(&self, _tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError> {
      self.delegations.lock().unwrap().push(delegation.clone());
      Ok(())
   }

   async fn update(&self, _tx: &mut TxContext, delegation: &Delegation) -> Result<(), InfraError> {
      let mut delegations = self.delegations.lock().unwrap();
      if let Some(pos) = delegations.iter().position(|d| d.id() == delegation.id()) {
         delegations[pos] = delegation.clone();
      }
      Ok(())
   }

   async fn find_by_id(&self, id: &DelegationId) -> Result<Option<Delegation>, InfraError> {
      Ok(self
         .delegations
         .lock()
         .unwrap()
         .iter()
         .find(|d| d.id() == id)
         .cloned())
   }

   async fn find_by_delegator(&self, delegator: &UserId) -> Result<Vec<Delegation>, InfraError> {
      Ok(self
         .delegations
         .lock()
         .unwrap()
         .iter()
         .filter(|d| d.delegator() == delegator)
         .cloned()
         .collect())
   }

   async fn find_by_delegator_for_update(
      &self,
      tx: &mut TxContext,
      delegator: &UserId,
   ) -> Result<Vec<Delegation>, InfraError> {
      let guard = self.delegator_lock.clone().lock_owned().await;
      tx.hold(guard);
      self.find_by_delegator(delegator).await
   }

   async fn find_all(&self) -> Result<Vec<Delegation>, InfraError> {
      Ok(self.delegations.lock().unwrap().clone())
   }

   async fn find_in_force(
      &self,
      delegators: &[UserId],
      date: NaiveDate,
   ) -> Result<Vec<Delegation>, InfraError> {
      Ok(self
         .delegations
         .lock()
         .unwrap()
         .iter()
         .filter(|d| delegators.contains(d.delegator()) && d.is_in_force_on(date))
         .cloned()
         .collect())
   }
}

// ===== MockOrgDirectory =====

#[derive(Clone, Default)]
pub struct MockOrgDirectory {
   employees: Arc<Mutex<Vec<Employee>>>,
   roles:     Arc<Mutex<Vec<(UserId, String)>>>,
}

impl MockOrgDirectory {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn add_employee(&self, employee: Employee) {
      self.employees.lock().unwrap().push(employee);
   }

   pub fn grant_role(&self, user_id: &UserId, role: impl Into<String>) {
      self.roles.lock().unwrap().push((user_id.clone(), role.into()));
   }
}

#[async_trait]
impl OrgDirectory for MockOrgDirectory {
   async fn find_employee(&self, id: &UserId) -> Result<Option<Employee>, InfraError> {
      Ok(self
         .employees
         .lock()
         .unwrap()
         .iter()
         .find(|e| e.id() == id)
         .cloned())
   }

   async fn users_with_role(&self, role: &str) -> Result<Vec<UserId>, InfraError> {
      Ok(self
         .roles
         .lock()
         .unwrap()
         .iter()
         .filter(|(_, r)| r == role)
         .map(|(user, _)| user.clone())
         .collect())
   }
}
