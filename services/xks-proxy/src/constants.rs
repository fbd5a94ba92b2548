// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::time::Duration;

// Signing parameters used by the xks proxy.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const XKS_SERVICE: &str = "kms-xks-proxy";
pub const REQUEST_TYPE: &str = "aws4_request";

// Headers used in xks requests.
pub const X_AMZ_DATE: &str = "x-amz-date";

// Env values used to configure the driver.
pub const CM_URL: &str = "CM_URL";
pub const AWS_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
pub const AWS_REGION: &str = "AWS_REGION";
pub const CKS_ID: &str = "CKS_ID";
pub const HYOK_KEY_ID: &str = "HYOK_KEY_ID";
pub const CKS_ACCESS_ID: &str = "CKS_ACCESS_ID";
pub const CKS_SECRET_KEY: &str = "CKS_SECRET_KEY";
pub const SKIP_TLS_VERIFICATION: &str = "SKIP_TLS_VERIFICATION";
pub const SLEEP_DURATION: &str = "SLEEP_DURATION";

// Fixed request metadata.
pub const DEFAULT_AWS_USER: &str = "Alice";
pub const DEFAULT_KMS_KEY_ID: &str = "1234abcd-12ab-34cd-56ef-1234567890ab";
pub const KMS_VIA_SERVICE: &str = "ebs";

/// Calls slower than this are counted as timeouts.
pub const DEFAULT_TIMEOUT_THRESHOLD: Duration = Duration::from_millis(250);

/// Size in bytes of the random plaintext and aad generated per iteration.
pub const RANDOM_PAYLOAD_SIZE: usize = 32;
